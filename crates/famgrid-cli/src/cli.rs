use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use famgrid_core::FamilyGraph;
use famgrid_core::normalize::{FlatFamily, normalize};
use famgrid_layout::{Depths, LayoutEngine, LayoutRequest};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, Result};
use crate::summary::write_summary;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "FAMGRID_LOG";

/// Depths used when neither a request file nor a flag sets them.
pub const DEFAULT_DEPTHS: Depths = Depths::new(2, 2, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed layout JSON.
    #[default]
    Json,
    /// One line per grid row, for eyeballing.
    Summary,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "famgrid",
    about = "Lay out a family tree around one person on a grid",
    version
)]
pub struct Args {
    /// Family JSON file, or `-` for stdin.
    #[arg(long, short, default_value = "-")]
    pub input: PathBuf,

    /// Input holds flat people/parent/partnership tables instead of a graph.
    #[arg(long)]
    pub flat: bool,

    /// JSON layout request; explicit flags override its fields.
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Person the tree is drawn around.
    #[arg(long, short)]
    pub focal: Option<String>,

    /// Person to highlight.
    #[arg(long)]
    pub marked: Option<String>,

    #[arg(long)]
    pub ancestors: Option<u8>,

    #[arg(long)]
    pub descendants: Option<u8>,

    #[arg(long)]
    pub siblings: Option<u8>,

    /// Mirror the layout horizontally.
    #[arg(long)]
    pub flip: bool,

    #[arg(long)]
    pub marriage_dates: bool,

    #[arg(long)]
    pub divorce_dates: bool,

    #[arg(long)]
    pub relationship_dates: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Report failures as a JSON object on stderr.
    #[arg(long)]
    pub json_errors: bool,
}

pub fn run(args: &Args) -> Result<()> {
    init_tracing(args.log_json);
    let stdout = io::stdout();
    execute(args, &mut stdout.lock())
}

/// Load the graph and request, lay out, and write the result to `out`.
pub fn execute(args: &Args, out: &mut dyn Write) -> Result<()> {
    let graph = load_graph(&args.input, args.flat)?;
    let request = build_request(args)?;
    tracing::debug!(
        target: "famgrid.cli",
        people = graph.len(),
        focal = %request.focal,
        "laying out"
    );

    let layout = LayoutEngine::default().build(&graph, &request)?;
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &layout)
                .map_err(|err| CliError::Output(err.into()))?;
            writeln!(out).map_err(CliError::Output)?;
        }
        OutputFormat::Summary => write_summary(&layout, out).map_err(CliError::Output)?,
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    // A subscriber may already be installed by an embedding process.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| CliError::io("<stdin>", err))?;
        Ok(text)
    } else {
        fs::read_to_string(path).map_err(|err| CliError::io(path, err))
    }
}

pub fn load_graph(path: &Path, flat: bool) -> Result<FamilyGraph> {
    let text = read_source(path)?;
    if flat {
        let tables: FlatFamily =
            serde_json::from_str(&text).map_err(|err| CliError::json(path, err))?;
        Ok(normalize(&tables)?)
    } else {
        serde_json::from_str(&text).map_err(|err| CliError::json(path, err))
    }
}

/// Merge the optional request file with explicit flags.
pub fn build_request(args: &Args) -> Result<LayoutRequest> {
    let mut request = match &args.request {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|err| CliError::io(path, err))?;
            serde_json::from_str(&text).map_err(|err| CliError::json(path, err))?
        }
        None => LayoutRequest {
            depths: DEFAULT_DEPTHS,
            ..LayoutRequest::default()
        },
    };

    if let Some(focal) = &args.focal {
        request.focal = focal.as_str().into();
    }
    if let Some(marked) = &args.marked {
        request.marked = Some(marked.as_str().into());
    }
    if let Some(depth) = args.ancestors {
        request.depths.ancestors = depth;
    }
    if let Some(depth) = args.descendants {
        request.depths.descendants = depth;
    }
    if let Some(depth) = args.siblings {
        request.depths.siblings = depth;
    }
    request.flip |= args.flip;
    request.display.marriage_dates |= args.marriage_dates;
    request.display.divorce_dates |= args.divorce_dates;
    request.display.relationship_dates |= args.relationship_dates;

    if request.focal.as_str().is_empty() {
        return Err(CliError::invalid(
            "no focal person: pass --focal or set `focal` in the request file",
        ));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use famgrid_core::{Error, Gender, ParentKind, PartnerKind, Partnership, Person};
    use tempfile::tempdir;

    use super::*;

    fn args(input: &Path) -> Args {
        let input = input.display().to_string();
        Args::parse_from(["famgrid", "--input", input.as_str()])
    }

    fn write_family(dir: &Path) -> PathBuf {
        let mut graph: FamilyGraph = [
            Person::new("p1", "Pat", Gender::Male),
            Person::new("p2", "Sam", Gender::Female),
            Person::new("c1", "Kit", Gender::Other),
        ]
        .into_iter()
        .collect();
        graph.link_partners("p1", "p2", Partnership::of_kind(PartnerKind::Married));
        graph.link_parents("c1", Some("p2"), Some("p1"), ParentKind::Biological);
        let path = dir.join("family.json");
        fs::write(&path, graph.to_json().expect("graph json")).expect("write family");
        path
    }

    #[test]
    fn flags_parse_into_args() {
        let args = Args::parse_from([
            "famgrid",
            "--focal",
            "p1",
            "--ancestors",
            "3",
            "--flip",
            "--format",
            "summary",
            "--marriage-dates",
        ]);
        assert_eq!(args.input, PathBuf::from("-"));
        assert_eq!(args.ancestors, Some(3));
        assert_eq!(args.format, OutputFormat::Summary);
        assert!(args.flip && args.marriage_dates && !args.divorce_dates);
    }

    #[test]
    fn flags_override_request_file() {
        let dir = tempdir().expect("tempdir");
        let request_path = dir.path().join("request.json");
        fs::write(
            &request_path,
            r#"{"focal":"p2","depths":{"ancestors":4,"descendants":1}}"#,
        )
        .expect("write request");

        let mut args = args(Path::new("-"));
        args.request = Some(request_path);
        args.descendants = Some(3);
        let request = build_request(&args).expect("request");
        assert_eq!(request.focal.as_str(), "p2");
        assert_eq!(request.depths, Depths::new(4, 3, 0));

        args.focal = Some("p1".into());
        assert_eq!(build_request(&args).expect("request").focal.as_str(), "p1");
    }

    #[test]
    fn missing_focal_is_an_invalid_argument() {
        let error = build_request(&args(Path::new("-"))).expect_err("no focal");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn json_output_round_trips() {
        let dir = tempdir().expect("tempdir");
        let mut args = args(&write_family(dir.path()));
        args.focal = Some("p1".into());

        let mut out = Vec::new();
        execute(&args, &mut out).expect("layout");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json output");
        assert_eq!(value["entities"]["p1"]["focal"], true);
        assert_eq!(value["entities"]["c1"]["y"], 1);
    }

    #[test]
    fn summary_output_lists_rows() {
        let dir = tempdir().expect("tempdir");
        let mut args = args(&write_family(dir.path()));
        args.focal = Some("c1".into());
        args.format = OutputFormat::Summary;

        let mut out = Vec::new();
        execute(&args, &mut out).expect("layout");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("focal c1: 3 people"));
        assert!(text.contains("row -1:"));
        assert!(text.contains("*c1@0.00"));
    }

    #[test]
    fn flat_tables_are_normalized() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("flat.json");
        fs::write(
            &path,
            r#"{
                "people": [
                    {"id": "m", "name": "Mum", "gender": "female"},
                    {"id": "k", "name": "Kid"}
                ],
                "parent_links": [{"child": "k", "mother": "m", "kind": "adoptive"}]
            }"#,
        )
        .expect("write flat");

        let graph = load_graph(&path, true).expect("flat graph");
        assert_eq!(graph.get("m").map(|m| m.children.len()), Some(1));
    }

    #[test]
    fn errors_map_to_exit_codes() {
        let dir = tempdir().expect("tempdir");
        let mut missing = args(&dir.path().join("nope.json"));
        missing.focal = Some("p1".into());
        assert_eq!(execute(&missing, &mut Vec::new()).expect_err("io").exit_code(), 3);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").expect("write bad");
        let mut malformed = args(&bad);
        malformed.focal = Some("p1".into());
        assert_eq!(execute(&malformed, &mut Vec::new()).expect_err("json").exit_code(), 4);

        let mut ghost = args(&write_family(dir.path()));
        ghost.focal = Some("ghost".into());
        let error = execute(&ghost, &mut Vec::new()).expect_err("focal");
        assert!(matches!(error, CliError::Family(Error::FocalNotFound(_))));
        assert_eq!(error.exit_code(), 5);
    }
}
