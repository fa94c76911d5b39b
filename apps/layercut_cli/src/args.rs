use anyhow::{anyhow, bail, Context, Result};
use std::collections::VecDeque;
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: layercut <command> [args]

commands:
  probe <video>
  new <video> <project> [--output DIR]
  list <project> [--layer N]
  mark <project> --start T --end T [--layer N] [--title S]
  delete <project> <id>
  reindex <project>
  sort <project> title|start
  export <project> [--all-layers] [--layer N] [--output DIR]
  snapshot <project> --at T [--output DIR]

times are hh:mm:ss.sss, mm:ss.sss or seconds.
config is read from $LAYERCUT_CONFIG or ./layercut.toml.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Start,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Probe {
        video: PathBuf,
    },
    New {
        video: PathBuf,
        project: PathBuf,
        output: Option<PathBuf>,
    },
    List {
        project: PathBuf,
        layer: Option<u32>,
    },
    Mark {
        project: PathBuf,
        layer: u32,
        start: String,
        end: String,
        title: Option<String>,
    },
    Delete {
        project: PathBuf,
        id: u32,
    },
    Reindex {
        project: PathBuf,
    },
    Sort {
        project: PathBuf,
        key: SortKey,
    },
    Export {
        project: PathBuf,
        all_layers: bool,
        layer: u32,
        output: Option<PathBuf>,
    },
    Snapshot {
        project: PathBuf,
        at: String,
        output: Option<PathBuf>,
    },
    Help,
}

/// Parse everything after the program name.
pub fn parse<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let raw: Vec<String> = args.into_iter().map(Into::into).collect();
    if matches!(raw.first().map(String::as_str), None | Some("help" | "-h" | "--help")) {
        return Ok(Command::Help);
    }
    let mut args = Args::split(raw)?;
    let Some(name) = args.next_positional() else {
        return Ok(Command::Help);
    };

    let command = match name.as_str() {
        "probe" => Command::Probe {
            video: args.required_path("video")?,
        },
        "new" => Command::New {
            video: args.required_path("video")?,
            project: args.required_path("project")?,
            output: args.option("--output").map(PathBuf::from),
        },
        "list" => Command::List {
            project: args.required_path("project")?,
            layer: args.option("--layer").map(|v| parse_layer(&v)).transpose()?,
        },
        "mark" => Command::Mark {
            project: args.required_path("project")?,
            layer: args.layer_or_default()?,
            start: args.required_option("--start")?,
            end: args.required_option("--end")?,
            title: args.option("--title"),
        },
        "delete" => {
            let project = args.required_path("project")?;
            let id = args
                .next_positional()
                .ok_or_else(|| anyhow!("missing segment id"))?;
            Command::Delete {
                project,
                id: id.parse().with_context(|| format!("invalid segment id: {id}"))?,
            }
        }
        "reindex" => Command::Reindex {
            project: args.required_path("project")?,
        },
        "sort" => {
            let project = args.required_path("project")?;
            let key = match args.next_positional().as_deref() {
                Some("title") => SortKey::Title,
                Some("start") => SortKey::Start,
                Some(other) => bail!("unknown sort key: {other}"),
                None => bail!("missing sort key (title|start)"),
            };
            Command::Sort { project, key }
        }
        "export" => Command::Export {
            project: args.required_path("project")?,
            all_layers: args.flag("--all-layers"),
            layer: args.layer_or_default()?,
            output: args.option("--output").map(PathBuf::from),
        },
        "snapshot" => Command::Snapshot {
            project: args.required_path("project")?,
            at: args.required_option("--at")?,
            output: args.option("--output").map(PathBuf::from),
        },
        other => bail!("unknown command: {other}"),
    };

    args.finish()?;
    Ok(command)
}

fn parse_layer(value: &str) -> Result<u32> {
    value
        .parse()
        .with_context(|| format!("invalid layer: {value}"))
}

/// Options without a value.
const FLAGS: &[&str] = &["--all-layers"];

/// Arguments split into positionals, `--name value` options and bare flags.
/// Each accessor consumes what it reads so leftovers can be reported.
struct Args {
    positionals: VecDeque<String>,
    options: Vec<(String, String)>,
    flags: Vec<String>,
}

impl Args {
    fn split(raw: Vec<String>) -> Result<Self> {
        let mut args = Self {
            positionals: VecDeque::new(),
            options: Vec::new(),
            flags: Vec::new(),
        };
        let mut iter = raw.into_iter();
        while let Some(arg) = iter.next() {
            if FLAGS.contains(&arg.as_str()) {
                args.flags.push(arg);
            } else if arg.starts_with("--") {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("{arg} needs a value"))?;
                args.options.push((arg, value));
            } else {
                args.positionals.push_back(arg);
            }
        }
        Ok(args)
    }

    fn next_positional(&mut self) -> Option<String> {
        self.positionals.pop_front()
    }

    fn required_path(&mut self, what: &str) -> Result<PathBuf> {
        self.next_positional()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("missing {what} path"))
    }

    fn flag(&mut self, name: &str) -> bool {
        let before = self.flags.len();
        self.flags.retain(|f| f != name);
        self.flags.len() != before
    }

    fn option(&mut self, name: &str) -> Option<String> {
        let pos = self.options.iter().position(|(k, _)| k == name)?;
        Some(self.options.remove(pos).1)
    }

    fn required_option(&mut self, name: &str) -> Result<String> {
        self.option(name)
            .ok_or_else(|| anyhow!("{name} is required"))
    }

    fn layer_or_default(&mut self) -> Result<u32> {
        Ok(self
            .option("--layer")
            .map(|v| parse_layer(&v))
            .transpose()?
            .unwrap_or(1))
    }

    fn finish(self) -> Result<()> {
        if let Some(extra) = self.positionals.front() {
            bail!("unexpected argument: {extra}");
        }
        if let Some((name, _)) = self.options.first() {
            bail!("unknown option: {name}");
        }
        if let Some(flag) = self.flags.first() {
            bail!("unknown option: {flag}");
        }
        Ok(())
    }
}
