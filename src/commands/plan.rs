use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fitplan::client::{ResourceClient, UploadClient, UploadFile};
use fitplan::editor::{EditorError, FieldPath, NestedEditor};
use fitplan::panel::ResourcePanel;
use fitplan::schema::PlanResource;
use fitplan::shell::write_list;

use super::OutputFormat;

#[derive(Args)]
pub struct PlanCommand {
    #[command(subcommand)]
    pub command: PlanSubcommand,
}

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// List all plans
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a plan
    Show {
        /// Plan ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a new plan
    Create {
        #[command(flatten)]
        edits: EditArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a plan; anything not mentioned is kept
    Update {
        /// Plan ID
        id: i64,

        #[command(flatten)]
        edits: EditArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a plan
    Delete {
        /// Plan ID
        id: i64,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Form edits, applied in this order: item removals, group removals, new
/// groups, new items, field values, photos. Removals run from the highest
/// index down so earlier indices stay valid.
#[derive(Args, Default)]
pub struct EditArgs {
    /// Seed the form from a YAML or JSON file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Remove item I of group G (can be repeated)
    #[arg(long = "remove-item", value_name = "G.I", value_parser = parse_item_ref)]
    pub remove_items: Vec<ItemRef>,

    /// Remove group G (can be repeated)
    #[arg(long = "remove-group", value_name = "G")]
    pub remove_groups: Vec<usize>,

    /// Append N empty groups (meals or routines)
    #[arg(long = "add-group", value_name = "N", default_value_t = 0)]
    pub add_groups: usize,

    /// Append an empty item to group G (can be repeated)
    #[arg(long = "add-item", value_name = "G")]
    pub add_items: Vec<usize>,

    /// Set a field, e.g. "title=Week 1" or "0.1.sets=3" (can be repeated)
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    pub sets: Vec<Assignment>,

    /// Upload a photo for recipe G.I, e.g. "0.1=oats.jpg" (can be repeated)
    #[arg(long = "photo", value_name = "G.I=FILE", value_parser = parse_photo)]
    pub photos: Vec<PhotoArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub group: usize,
    pub item: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub path: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoArg {
    pub target: ItemRef,
    pub file: PathBuf,
}

fn parse_item_ref(s: &str) -> Result<ItemRef, String> {
    let invalid = || format!("Invalid item '{}'. Use GROUP.ITEM, e.g. 0.1", s);
    let (group, item) = s.trim().split_once('.').ok_or_else(invalid)?;
    Ok(ItemRef {
        group: group.parse().map_err(|_| invalid())?,
        item: item.parse().map_err(|_| invalid())?,
    })
}

fn parse_assignment(s: &str) -> Result<Assignment, String> {
    let (path, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid assignment '{}'. Use PATH=VALUE", s))?;
    Ok(Assignment {
        path: path.trim().to_string(),
        value: value.to_string(),
    })
}

fn parse_photo(s: &str) -> Result<PhotoArg, String> {
    let (target, file) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid photo '{}'. Use GROUP.ITEM=FILE", s))?;
    Ok(PhotoArg {
        target: parse_item_ref(target)?,
        file: PathBuf::from(file),
    })
}

impl PlanCommand {
    pub async fn run<R, C, U>(
        &self,
        panel: &mut ResourcePanel<R, C, U>,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        R: PlanResource,
        C: ResourceClient<R>,
        U: UploadClient,
    {
        let noun = R::SCHEMA.noun;
        match &self.command {
            PlanSubcommand::List { format } => {
                panel.load_list().await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(panel.items())?);
                    }
                    OutputFormat::Text => {
                        write_list(&mut io::stdout(), panel.items())?;
                    }
                }
                Ok(())
            }

            PlanSubcommand::Show { id, format } => {
                let plan = panel.fetch(*id).await?;
                print_plan(&plan, format)
            }

            PlanSubcommand::Create { edits, format } => {
                panel.open_create();
                apply_edits(panel, edits).await?;
                let created = panel.submit().await?;
                if let OutputFormat::Text = format {
                    println!("Created {}:", noun);
                }
                print_plan(&created, format)
            }

            PlanSubcommand::Update { id, edits, format } => {
                panel.open_edit_by_id(*id).await?;
                apply_edits(panel, edits).await?;
                let updated = panel.submit().await?;
                if let OutputFormat::Text = format {
                    println!("Updated {}:", noun);
                }
                print_plan(&updated, format)
            }

            PlanSubcommand::Delete { id, force } => {
                // Confirm unless --force
                if !force {
                    let plan = panel.fetch(*id).await?;
                    print!("Delete {} '{}' (#{})? [y/N] ", noun, plan.title(), id);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                panel.delete(*id).await?;
                println!("Deleted {} #{}", noun, id);
                Ok(())
            }
        }
    }
}

fn print_plan<R: PlanResource>(
    plan: &R,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Text => print!("{}", plan),
    }
    Ok(())
}

async fn apply_edits<R, C, U>(
    panel: &mut ResourcePanel<R, C, U>,
    edits: &EditArgs,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: PlanResource,
    C: ResourceClient<R>,
    U: UploadClient,
{
    let seed = match &edits.file {
        Some(path) => Some(read_seed::<R>(path)?),
        None => None,
    };

    let editor = panel.editor_mut()?;
    if let Some(seed) = &seed {
        editor.initialize(Some(seed))?;
    }
    apply_form_edits(editor, edits)?;

    if edits.photos.is_empty() {
        return Ok(());
    }
    for photo in &edits.photos {
        let file = UploadFile::from_path(&photo.file)
            .await
            .map_err(|e| format!("Cannot read '{}': {}", photo.file.display(), e))?;
        panel.begin_upload(photo.target.group, photo.target.item, file)?;
    }
    let attached = panel.settle_uploads().await;
    if attached < edits.photos.len() {
        return Err(format!(
            "{} of {} photo upload(s) failed",
            edits.photos.len() - attached,
            edits.photos.len()
        )
        .into());
    }
    Ok(())
}

/// Applies everything except photos to the draft.
fn apply_form_edits<R: PlanResource>(
    editor: &mut NestedEditor<R>,
    edits: &EditArgs,
) -> Result<(), EditorError> {
    let mut remove_items = edits.remove_items.clone();
    remove_items.sort_by(|a, b| (b.group, b.item).cmp(&(a.group, a.item)));
    remove_items.dedup();
    for target in remove_items {
        if editor.remove_item(target.group, target.item).is_none() {
            tracing::warn!("No item at {}.{}, nothing removed", target.group, target.item);
        }
    }

    let mut remove_groups = edits.remove_groups.clone();
    remove_groups.sort_unstable_by(|a, b| b.cmp(a));
    remove_groups.dedup();
    for group in remove_groups {
        if editor.remove_group(group).is_none() {
            tracing::warn!("No group at {}, nothing removed", group);
        }
    }

    for _ in 0..edits.add_groups {
        editor.add_group();
    }
    for &group in &edits.add_items {
        editor
            .add_item(group)
            .ok_or(EditorError::NoSuchGroup(group))?;
    }

    for assignment in &edits.sets {
        let path = FieldPath::parse(&assignment.path, R::SCHEMA)?;
        editor.set_field_from_str(&path, &assignment.value)?;
    }
    Ok(())
}

/// Reads a plan from YAML, or JSON when the extension says so.
fn read_seed<R: PlanResource>(path: &Path) -> Result<R, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let plan = if is_json {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid JSON in '{}': {}", path.display(), e))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Invalid YAML in '{}': {}", path.display(), e))?
    };
    Ok(plan)
}
