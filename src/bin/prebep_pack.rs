use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use prebep_index::{
    config, logging,
    pipeline::{IntakePipeline, ProjectForm, ProjectRequest, UploadedFile},
};

#[derive(Parser)]
#[command(
    name = "prebep-pack",
    about = "Summarize project documents and package them into <project>.zip"
)]
struct Cli {
    /// Project identifier; names the staging directory and the archive.
    #[arg(long)]
    project: String,
    /// Input document (.pdf or .docx). Repeat for several documents; order is preserved.
    #[arg(long = "input", required = true)]
    inputs: Vec<PathBuf>,
    /// Final Pre-BEP deliverable (.docx).
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value = "")]
    client: String,
    #[arg(long, default_value = "")]
    project_type: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value_t = 1)]
    bim_level: u8,
    /// Comma-separated BIM uses.
    #[arg(long, default_value = "")]
    bim_uses: String,
    #[arg(long, default_value_t = 6)]
    page_count: u32,
    /// Also copy the archive bytes to this path.
    #[arg(long)]
    download_to: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();
    let config = config::init_config().context("Failed to load configuration")?;
    let pipeline = IntakePipeline::from_config(config)
        .context("Failed to initialize summarization client")?;

    let inputs = cli
        .inputs
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;
    let request = ProjectRequest {
        project_name: cli.project,
        form: ProjectForm {
            client: cli.client,
            project_type: cli.project_type,
            location: cli.location,
            bim_level: cli.bim_level,
            bim_uses: cli.bim_uses,
            page_count: cli.page_count,
        },
        inputs,
        output: Some(read_upload(&cli.output)?),
    };

    let archive = match pipeline.run(request).await {
        Ok(archive) => archive,
        Err(err) => {
            let stage = err.stage();
            return Err(anyhow::Error::new(err).context(format!("{} stage failed", stage.as_str())));
        }
    };

    if let Some(destination) = cli.download_to {
        let download = archive.read_download()?;
        fs::write(&destination, &download.bytes)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        println!("copied to {}", destination.display());
    }

    println!("{}", archive.path.display());
    println!("sha256: {}", archive.sha256);
    Ok(())
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} does not name a file", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(UploadedFile::new(name, bytes))
}
