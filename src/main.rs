use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "manga-translator-rust",
    version,
    about = "Translate manga pages: on-device OCR, LLM translation, inpainting, text overlay"
)]
struct Cli {
    /// Input page images, processed in order
    inputs: Vec<PathBuf>,

    /// Target language (default: en)
    #[arg(short = 'l', long = "lang", default_value = "en")]
    lang: String,

    /// Source language of the page text
    #[arg(short = 'L', long = "source-lang", default_value = "ko")]
    source_lang: String,

    /// Translation model name (overrides settings)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides environment variables and .env)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Directory for exported pages (page_001.png, ...)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show OCR languages available to tesseract and exit
    #[arg(long = "show-ocr-languages")]
    show_ocr_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    manga_translator_rust::logging::init(cli.verbose)?;

    if cli.show_ocr_languages {
        let languages = manga_translator_rust::list_tesseract_languages()?;
        println!("{}", languages.join("\n"));
        return Ok(());
    }

    let config = manga_translator_rust::Config {
        inputs: cli.inputs,
        output_dir: cli.output,
        lang: cli.lang,
        source_lang: cli.source_lang,
        model: cli.model,
        key: cli.key,
        settings_path: cli.read_settings,
    };

    let output = manga_translator_rust::run(config).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
