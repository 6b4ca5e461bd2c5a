use anyhow::Result;
use clap::{Parser, Subcommand};
use semantic_chunks::commands::{
    configure, index_pdfs, index_text, init, insert_texts, search, show_status,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "semantic-chunks")]
#[command(about = "Index PDF documents as sentence chunks in PostgreSQL and search them by meaning")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.semantic-chunks)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the database and Ollama connections
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Create the pgvector extension and the record table
    Init,
    /// Extract, chunk and index PDF documents
    Index {
        /// PDF files to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Store literal texts, one record each
    Insert {
        /// Texts to store
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Chunk and index a literal string
    IndexText {
        /// Text to index
        text: String,
    },
    /// Print the stored texts nearest to a query
    Search {
        /// Query text
        query: String,
        /// Number of results (defaults to search.top_k from the config)
        #[arg(long, short = 'k', value_parser = clap::value_parser!(u16).range(1..))]
        top_k: Option<u16>,
    },
    /// Show store and embedder status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_deref();

    match cli.command {
        Commands::Config { show } => {
            configure(config_dir, show)?;
        }
        Commands::Init => {
            init(config_dir).await?;
        }
        Commands::Index { paths } => {
            index_pdfs(config_dir, &paths).await?;
        }
        Commands::Insert { texts } => {
            insert_texts(config_dir, &texts).await?;
        }
        Commands::IndexText { text } => {
            index_text(config_dir, &text).await?;
        }
        Commands::Search { query, top_k } => {
            search(config_dir, &query, top_k.map(usize::from)).await?;
        }
        Commands::Status => {
            show_status(config_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["semantic-chunks", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn index_command_with_paths() {
        let cli = Cli::try_parse_from(["semantic-chunks", "index", "a.pdf", "b.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { paths } = parsed.command {
                assert_eq!(paths, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
            } else {
                panic!("expected index command");
            }
        }
    }

    #[test]
    fn index_requires_a_path() {
        let cli = Cli::try_parse_from(["semantic-chunks", "index"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn insert_command_with_texts() {
        let cli = Cli::try_parse_from([
            "semantic-chunks",
            "insert",
            "The quick brown fox jumps over the lazy dog.",
            "The rain in Spain falls mainly on the plain.",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Insert { texts } = parsed.command {
                assert_eq!(texts.len(), 2);
            } else {
                panic!("expected insert command");
            }
        }
    }

    #[test]
    fn index_text_command() {
        let cli = Cli::try_parse_from(["semantic-chunks", "index-text", "One. Two. Three."]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::IndexText { text } if text == "One. Two. Three."));
        }
    }

    #[test]
    fn search_command_with_top_k() {
        let cli = Cli::try_parse_from(["semantic-chunks", "search", "fast fox", "--top-k", "5"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { query, top_k } = parsed.command {
                assert_eq!(query, "fast fox");
                assert_eq!(top_k, Some(5));
            } else {
                panic!("expected search command");
            }
        }
    }

    #[test]
    fn search_rejects_zero_top_k() {
        let cli = Cli::try_parse_from(["semantic-chunks", "search", "fast fox", "-k", "0"]);
        assert!(cli.is_err());
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from(["semantic-chunks", "search", "q", "--config-dir", "/tmp/sc"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/sc")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["semantic-chunks", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Config { show: true }));
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["semantic-chunks", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["semantic-chunks", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
