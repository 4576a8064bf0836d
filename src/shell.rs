//! Interactive console over the meal plan and workout plan panels.
//!
//! The shell owns one [`ResourcePanel`] per tab and turns one line of input
//! into one panel operation. Reading input and confirming deletes is left to
//! the caller so the shell can be driven from tests.

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::{ResourceClient, UploadClient, UploadFile};
use crate::editor::FieldPath;
use crate::models::{MealPlan, WorkoutPlan, MEAL_PLAN_SCHEMA, WORKOUT_PLAN_SCHEMA};
use crate::panel::{PanelError, PanelMode, RefreshPolicy, ResourcePanel};
use crate::schema::{PlanResource, ResourceSchema};

/// How long `submit` waits for photos still uploading before saving
/// without them.
pub const DEFAULT_UPLOAD_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    MealPlans,
    WorkoutPlans,
}

impl Tab {
    pub fn schema(&self) -> &'static ResourceSchema {
        match self {
            Tab::MealPlans => &MEAL_PLAN_SCHEMA,
            Tab::WorkoutPlans => &WORKOUT_PLAN_SCHEMA,
        }
    }

    pub fn label(&self) -> &'static str {
        self.schema().title
    }

    fn short_name(&self) -> &'static str {
        match self {
            Tab::MealPlans => "meals",
            Tab::WorkoutPlans => "workouts",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meals" | "meal" | "mealplans" => Ok(Tab::MealPlans),
            "workouts" | "workout" | "workoutplans" => Ok(Tab::WorkoutPlans),
            other => Err(format!(
                "Invalid tab '{}'. Valid values: meals, workouts",
                other
            )),
        }
    }
}

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Tab(Tab),
    List,
    Show(i64),
    New,
    Edit(i64),
    Set(String, String),
    AddGroup,
    AddItem(usize),
    RemoveGroup(usize),
    RemoveItem(usize, usize),
    Photo(usize, usize, PathBuf),
    Form,
    Submit,
    Cancel,
    Delete(i64),
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses a line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word.to_lowercase().as_str() {
            "tab" => {
                let name = args.first().ok_or_else(|| usage("tab <meals|workouts>"))?;
                ConsoleCommand::Tab(name.parse()?)
            }
            "list" | "ls" => ConsoleCommand::List,
            "show" => ConsoleCommand::Show(arg(&args, 0, "show <id>")?),
            "new" => ConsoleCommand::New,
            "edit" => ConsoleCommand::Edit(arg(&args, 0, "edit <id>")?),
            "set" => {
                let (path, value) = match rest.split_once(char::is_whitespace) {
                    Some((path, value)) => (path, value.trim()),
                    None => (rest, ""),
                };
                if path.is_empty() {
                    return Err(usage("set <path> <value>"));
                }
                ConsoleCommand::Set(path.to_string(), value.to_string())
            }
            "add-group" => ConsoleCommand::AddGroup,
            "add-item" => ConsoleCommand::AddItem(arg(&args, 0, "add-item <group>")?),
            "rm-group" => ConsoleCommand::RemoveGroup(arg(&args, 0, "rm-group <group>")?),
            "rm-item" => {
                let u = "rm-item <group> <item>";
                ConsoleCommand::RemoveItem(arg(&args, 0, u)?, arg(&args, 1, u)?)
            }
            "photo" => {
                let u = "photo <group> <item> <file>";
                let file = rest
                    .splitn(3, char::is_whitespace)
                    .nth(2)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| usage(u))?;
                ConsoleCommand::Photo(arg(&args, 0, u)?, arg(&args, 1, u)?, PathBuf::from(file))
            }
            "form" => ConsoleCommand::Form,
            "submit" | "save" => ConsoleCommand::Submit,
            "cancel" => ConsoleCommand::Cancel,
            "delete" => ConsoleCommand::Delete(arg(&args, 0, "delete <id>")?),
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => {
                return Err(format!(
                    "Unknown command '{}'. Type 'help' for a list.",
                    other
                ))
            }
        };
        Ok(Some(command))
    }
}

fn usage(text: &str) -> String {
    format!("Usage: {}", text)
}

fn arg<T: FromStr>(args: &[&str], index: usize, usage_text: &str) -> Result<T, String> {
    args.get(index)
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| usage(usage_text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell<MC, WC, U> {
    tab: Tab,
    meals: ResourcePanel<MealPlan, MC, U>,
    workouts: ResourcePanel<WorkoutPlan, WC, U>,
    upload_wait: Duration,
}

impl<MC, WC, U> Shell<MC, WC, U>
where
    MC: ResourceClient<MealPlan>,
    WC: ResourceClient<WorkoutPlan>,
    U: UploadClient,
{
    pub fn new(
        meals: ResourcePanel<MealPlan, MC, U>,
        workouts: ResourcePanel<WorkoutPlan, WC, U>,
    ) -> Self {
        Self {
            tab: Tab::default(),
            meals,
            workouts,
            upload_wait: DEFAULT_UPLOAD_WAIT,
        }
    }

    pub fn with_upload_wait(mut self, upload_wait: Duration) -> Self {
        self.upload_wait = upload_wait;
        self
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn meals(&self) -> &ResourcePanel<MealPlan, MC, U> {
        &self.meals
    }

    pub fn workouts(&self) -> &ResourcePanel<WorkoutPlan, WC, U> {
        &self.workouts
    }

    /// Prompt showing the tab and what the open form is doing.
    pub fn prompt(&self) -> String {
        let mode = match self.tab {
            Tab::MealPlans => self.meals.mode(),
            Tab::WorkoutPlans => self.workouts.mode(),
        };
        match mode {
            PanelMode::Closed => format!("{}> ", self.tab.short_name()),
            PanelMode::Creating => format!("{} (new)> ", self.tab.short_name()),
            PanelMode::Editing(id) => format!("{} (#{})> ", self.tab.short_name(), id),
        }
    }

    /// Shows the active tab and its list.
    pub async fn start<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(out, "== {} ==", self.tab.label())?;
        self.dispatch(ConsoleCommand::List, out).await
    }

    pub async fn execute<W: Write>(
        &mut self,
        command: ConsoleCommand,
        out: &mut W,
    ) -> io::Result<Flow> {
        let attached =
            self.meals.apply_completed_uploads() + self.workouts.apply_completed_uploads();
        if attached > 0 {
            writeln!(out, "Attached {} photo(s)", attached)?;
        }

        match command {
            ConsoleCommand::Tab(tab) => {
                self.tab = tab;
                self.start(out).await?;
            }
            ConsoleCommand::Help => write_help(out)?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
            other => self.dispatch(other, out).await?,
        }
        Ok(Flow::Continue)
    }

    async fn dispatch<W: Write>(&mut self, command: ConsoleCommand, out: &mut W) -> io::Result<()> {
        match self.tab {
            Tab::MealPlans => {
                run_panel_command(&mut self.meals, command, self.upload_wait, out).await
            }
            Tab::WorkoutPlans => {
                run_panel_command(&mut self.workouts, command, self.upload_wait, out).await
            }
        }
    }
}

async fn run_panel_command<R, C, U, W>(
    panel: &mut ResourcePanel<R, C, U>,
    command: ConsoleCommand,
    upload_wait: Duration,
    out: &mut W,
) -> io::Result<()>
where
    R: PlanResource,
    C: ResourceClient<R>,
    U: UploadClient,
    W: Write,
{
    let schema = R::SCHEMA;
    match command {
        ConsoleCommand::List => {
            if let Err(e) = panel.load_list().await {
                writeln!(out, "Error: {} (showing last loaded list)", e)?;
            }
            write_list(out, panel.items())?;
        }
        ConsoleCommand::Show(id) => match panel.fetch(id).await {
            Ok(resource) => write!(out, "{}", resource)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::New => {
            panel.open_create();
            write_form(out, panel)?;
        }
        ConsoleCommand::Edit(id) => {
            let result = match panel.find(id).cloned() {
                Some(resource) => panel.open_edit(&resource),
                None => panel.open_edit_by_id(id).await,
            };
            match result {
                Ok(()) => write_form(out, panel)?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
        }
        ConsoleCommand::Set(path, value) => match set_field(panel, &path, &value) {
            Ok(path) => writeln!(out, "{} = {}", path, value)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::AddGroup => match panel.editor_mut() {
            Ok(editor) => {
                editor.add_group();
                let g = editor.groups().len() - 1;
                writeln!(out, "Added {} {}", schema.groups.label.to_lowercase(), g)?;
            }
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::AddItem(g) => match panel.editor_mut() {
            Ok(editor) => match editor.add_item(g) {
                Some(_) => {
                    let i = editor.groups()[g].items.len() - 1;
                    writeln!(out, "Added {} {}.{}", schema.items.label.to_lowercase(), g, i)?;
                }
                None => writeln!(
                    out,
                    "No {} at index {}",
                    schema.groups.label.to_lowercase(),
                    g
                )?,
            },
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::RemoveGroup(g) => match panel.editor_mut() {
            Ok(editor) => match editor.remove_group(g) {
                Some(_) => writeln!(out, "Removed {} {}", schema.groups.label.to_lowercase(), g)?,
                None => writeln!(out, "Nothing to remove at {}", g)?,
            },
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::RemoveItem(g, i) => match panel.editor_mut() {
            Ok(editor) => match editor.remove_item(g, i) {
                Some(_) => writeln!(
                    out,
                    "Removed {} {}.{}",
                    schema.items.label.to_lowercase(),
                    g,
                    i
                )?,
                None => writeln!(out, "Nothing to remove at {}.{}", g, i)?,
            },
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        ConsoleCommand::Photo(g, i, path) => match UploadFile::from_path(&path).await {
            Ok(file) => {
                let name = file.file_name.clone();
                match panel.begin_upload(g, i, file) {
                    Ok(_) => writeln!(out, "Uploading {} for {}.{}", name, g, i)?,
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            Err(e) => writeln!(out, "Error: cannot read {}: {}", path.display(), e)?,
        },
        ConsoleCommand::Form => {
            if panel.is_open() {
                write_form(out, panel)?;
            } else {
                writeln!(out, "No form is open. Use 'new' or 'edit <id>'.")?;
            }
        }
        ConsoleCommand::Submit => {
            let pending = panel.pending_uploads();
            if pending > 0 {
                writeln!(out, "Waiting for {} upload(s)...", pending)?;
            }
            let attached = panel.settle_uploads_within(upload_wait).await;
            if attached > 0 {
                writeln!(out, "Attached {} photo(s)", attached)?;
            }
            let stuck = panel.pending_uploads();
            if stuck > 0 {
                writeln!(out, "{} upload(s) still running; saving without them", stuck)?;
            }
            match panel.submit().await {
                Ok(saved) => {
                    writeln!(out, "Saved {} '{}'", schema.noun, saved.title())?;
                    if panel.refresh_policy() == RefreshPolicy::EagerFullRefresh {
                        write_list(out, panel.items())?;
                    }
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
        }
        ConsoleCommand::Cancel => {
            if panel.is_open() {
                panel.cancel();
                writeln!(out, "Discarded changes")?;
            } else {
                writeln!(out, "No form is open")?;
            }
        }
        ConsoleCommand::Delete(id) => {
            match panel.delete(id).await {
                Ok(()) => writeln!(out, "Deleted {} #{}", schema.noun, id)?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
            if panel.refresh_policy() == RefreshPolicy::EagerFullRefresh {
                write_list(out, panel.items())?;
            }
        }
        // handled by the shell
        ConsoleCommand::Tab(_) | ConsoleCommand::Help | ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn set_field<R, C, U>(
    panel: &mut ResourcePanel<R, C, U>,
    raw_path: &str,
    value: &str,
) -> Result<FieldPath, PanelError>
where
    R: PlanResource,
    C: ResourceClient<R>,
    U: UploadClient,
{
    let path = FieldPath::parse(raw_path, R::SCHEMA)?;
    panel.editor_mut()?.set_field_from_str(&path, value)?;
    Ok(path)
}

/// Writes the one-line-per-resource list used by the console and `list`.
pub fn write_list<R: PlanResource, W: Write>(out: &mut W, items: &[R]) -> io::Result<()> {
    let schema = R::SCHEMA;
    if items.is_empty() {
        return writeln!(out, "No {}s found", schema.noun);
    }

    for item in items {
        let id = item
            .id()
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "  {:<6} {} ({})",
            id,
            item.title(),
            schema.groups.count_label(item.group_count())
        )?;
    }
    writeln!(out, "\nTotal: {} {}(s)", items.len(), schema.noun)
}

fn write_form<R, C, U, W>(out: &mut W, panel: &ResourcePanel<R, C, U>) -> io::Result<()>
where
    R: PlanResource,
    C: ResourceClient<R>,
    U: UploadClient,
    W: Write,
{
    let noun = R::SCHEMA.noun;
    match panel.mode() {
        PanelMode::Creating => writeln!(out, "New {}", noun)?,
        PanelMode::Editing(id) => writeln!(out, "Editing {} #{}", noun, id)?,
        PanelMode::Closed => return Ok(()),
    }
    write!(out, "{}", panel.editor())?;
    let pending = panel.pending_uploads();
    if pending > 0 {
        writeln!(out, "({} upload(s) in progress)", pending)?;
    }
    writeln!(out, "(* required)")
}

fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "\
Commands:
  tab meals|workouts       switch tab
  list                     reload and show the list
  show <id>                show one plan
  new                      open an empty form
  edit <id>                open a plan for editing
  set <path> <value>       set a field (title, 0.name, 0.1.sets)
  add-group                append a meal / routine
  add-item <g>             append a recipe / exercise to group g
  rm-group <g>             remove group g
  rm-item <g> <i>          remove item i of group g
  photo <g> <i> <file>     upload a recipe photo
  form                     show the open form
  submit                   save the open form
  cancel                   discard the open form
  delete <id>              delete a plan
  quit                     leave the console"
    )
}
