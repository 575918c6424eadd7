use clap::{Parser, Subcommand};

use storynova::commands::{self, GenerateStoryRequest};
use storynova::utils::logger;
use storynova::{AppConfig, AppResult, AppState};

#[derive(Parser)]
#[command(
    name = "storynova",
    version,
    about = "Turn a one-line premise into an illustrated, read-aloud children's story"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new story from a premise
    Generate {
        /// What the adventure is about
        description: String,
        /// Story template: adventure, mystery, friendship or problem_solving
        #[arg(long, default_value = "adventure")]
        template: String,
        /// Append a summary animation page at the end
        #[arg(long)]
        animate: bool,
        /// Reading mode the animation is timed for
        #[arg(long, default_value = "normal")]
        reading_mode: String,
        /// Save the story under this title right away
        #[arg(long)]
        save_as: Option<String>,
    },
    /// List saved stories
    List,
    /// Print a saved story as JSON
    Show { id: String },
    /// Delete a saved story
    Delete { id: String },
    /// List available narrator voices
    Voices,
    /// List the built-in story templates
    Templates,
    /// Word-timing preview for a block of text
    Timing {
        text: String,
        #[arg(long, default_value = "normal")]
        mode: String,
    },
}

#[tokio::main]
async fn main() {
    logger::init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let state = AppState::new(AppConfig::from_env());
    state.init()?;

    match cli.command {
        Command::Generate {
            description,
            template,
            animate,
            reading_mode,
            save_as,
        } => {
            let request = GenerateStoryRequest {
                description,
                template_type: template,
                enable_animation: animate,
                animation_reading_mode: reading_mode,
            };
            let story = commands::generate_story(&state, &request).await?;

            println!(
                "Generated {} pages (staged as {})",
                story.content.len(),
                story.temp_id
            );
            for page in &story.content {
                println!("  page {}: {}", page.page, page.image);
            }
            if story.has_summary_animation {
                println!("  includes a story summary animation");
            }

            if let Some(title) = save_as {
                let story_id = commands::save_story(&state, &story.temp_id, &title)?;
                println!("Saved as '{}' ({})", title, story_id);
            }
        }
        Command::List => {
            let stories = commands::get_stories(&state)?;
            println!("{}", serde_json::to_string_pretty(&stories)?);
        }
        Command::Show { id } => {
            let story = commands::view_story(&state, &id)?;
            println!("{}", serde_json::to_string_pretty(&story)?);
        }
        Command::Delete { id } => {
            commands::delete_story(&state, &id)?;
            println!("Deleted {}", id);
        }
        Command::Voices => {
            let voices = commands::get_voices(&state).await;
            println!("{}", serde_json::to_string_pretty(&voices)?);
        }
        Command::Templates => {
            println!("{}", serde_json::to_string_pretty(&commands::story_templates())?);
        }
        Command::Timing { text, mode } => {
            let preview = commands::analyze_timing(&state, &text, &mode);
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
    }

    Ok(())
}
