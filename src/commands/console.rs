use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use fitplan::client::{ResourceClient, UploadClient};
use fitplan::models::{MealPlan, WorkoutPlan};
use fitplan::shell::{ConsoleCommand, Flow, Shell};

/// Runs the console on stdin and stdout until `quit` or end of input.
pub async fn run<MC, WC, U>(shell: &mut Shell<MC, WC, U>) -> Result<(), Box<dyn std::error::Error>>
where
    MC: ResourceClient<MealPlan>,
    WC: ResourceClient<WorkoutPlan>,
    U: UploadClient,
{
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    writeln!(
        out,
        "fitplan {}. Type 'help' for commands.",
        fitplan::version()
    )?;
    run_with(shell, input, &mut out).await
}

async fn run_with<MC, WC, U, I, W>(
    shell: &mut Shell<MC, WC, U>,
    input: I,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>>
where
    MC: ResourceClient<MealPlan>,
    WC: ResourceClient<WorkoutPlan>,
    U: UploadClient,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    shell.start(out).await?;

    loop {
        write!(out, "{}", shell.prompt())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{}", e)?;
                continue;
            }
        };

        if let ConsoleCommand::Delete(id) = command {
            write!(out, "Delete {} #{}? [y/N] ", shell.tab().schema().noun, id)?;
            out.flush()?;

            let answer = lines.next_line().await?.unwrap_or_default();
            if !answer.trim().eq_ignore_ascii_case("y") {
                writeln!(out, "Deletion cancelled.")?;
                continue;
            }
        }

        if shell.execute(command, out).await? == Flow::Quit {
            break;
        }
    }

    Ok(())
}
