use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use jamplate_lang::{Document, Engine};
use miette::{miette, IntoDiagnostic};

#[derive(Parser, Debug)]
#[command(name = "jamplate")]
#[command(version)]
#[command(after_help = "Examples:\n\n\
    To render a template file:\n\
    $ jamplate page.jp\n\n\
    To render stdin with a predefined value:\n\
    $ echo '#{NAME}#' | jamplate -D NAME=world\n\n\
    To write outputs into a directory:\n\
    $ jamplate -o build a.jp b.jp")]
#[command(
    about = "jamplate is a template processor that renders documents with directives, expressions and injections.",
    long_about = None
)]
pub struct Cli {
    /// Template files to render; stdin when empty
    files: Vec<PathBuf>,

    /// Write rendered output into this directory instead of stdout
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Predefine a heap value as NAME=VALUE
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    defines: Vec<String>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let mut engine = Engine::new();
        let documents = self.documents()?;

        // register everything up front so #include can reach any input
        for document in &documents {
            engine.load(document.clone());
        }

        let mut failed = false;
        for document in documents {
            let name = document.name().to_string();
            log::info!("rendering {name}");
            match engine.process(document) {
                Ok(output) => self.emit(&name, &output)?,
                Err(error) => {
                    failed = true;
                    eprintln!("{:?}", miette::Report::new(error));
                }
            }
        }

        let diagnostics = engine.diagnostics();
        if !diagnostics.is_empty() {
            eprintln!("{diagnostics}");
        }
        if failed {
            return Err(miette!("one or more documents failed to render"));
        }
        Ok(())
    }

    /// The input documents with any `-D` preamble applied.
    fn documents(&self) -> miette::Result<Vec<Document>> {
        let preamble = self.preamble()?;
        let with_preamble = |document: Document| match preamble.as_str() {
            "" => document,
            preamble => Document::pseudo(
                document.name().to_string(),
                format!("{preamble}{}", document.read()),
            ),
        };

        if self.files.is_empty() {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .into_diagnostic()?;
            return Ok(vec![with_preamble(Document::pseudo("<stdin>", content))]);
        }
        self.files
            .iter()
            .map(|path| Document::open(path).into_diagnostic().map(&with_preamble))
            .collect()
    }

    /// `-D NAME=VALUE` pairs as `#declare` lines.
    fn preamble(&self) -> miette::Result<String> {
        let mut preamble = String::new();
        for define in &self.defines {
            let (key, value) = define
                .split_once('=')
                .ok_or_else(|| miette!("--define takes NAME=VALUE, got \"{define}\""))?;
            preamble.push_str(&format!("#declare {key} {value}\n"));
        }
        Ok(preamble)
    }

    fn emit(&self, name: &str, output: &str) -> miette::Result<()> {
        match &self.output {
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(output.as_bytes()).into_diagnostic()?;
                handle.flush().into_diagnostic()
            }
            Some(directory) => {
                std::fs::create_dir_all(directory).into_diagnostic()?;
                let file_name = PathBuf::from(name)
                    .file_name()
                    .map(|f| f.to_os_string())
                    .unwrap_or_else(|| "out".into());
                let target = directory.join(file_name);
                log::info!("writing {}", target.display());
                std::fs::write(target, output).into_diagnostic()
            }
        }
    }
}
