use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use classroom_zip::classroom::ClassroomClient;
use classroom_zip::config;
use classroom_zip::extract;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Course whose attachments should be listed
    #[arg(long)]
    course_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let classroom = ClassroomClient::from_config(&cfg)?;

    match args.course_id {
        None => {
            let courses = extract::list_courses(&classroom).await?;
            println!("{} courses", courses.len());
            for course in courses {
                println!(
                    "{}\t{}\t{}\t{}",
                    course.id,
                    course.state.as_deref().unwrap_or("-"),
                    course.name,
                    course.section.as_deref().unwrap_or("")
                );
            }
        }
        Some(course_id) => {
            let attachments = extract::list_attachments(&classroom, &course_id).await?;
            println!("{} attachments in course {}", attachments.len(), course_id);
            for a in attachments {
                println!("{}\t{}\t{}", a.file_id, a.source.as_str(), a.title);
            }
        }
    }
    Ok(())
}
