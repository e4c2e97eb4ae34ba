use csvnorm::csv_io::{read_csv, write_csv};
use csvnorm::sql::{Dialect, parse_sql};
use csvnorm::sqlite::SqliteSession;
use csvnorm::{
    JoinKind, NormaliseOptions, RowTransform, Schema, denormalise_prepare, empty_deleter,
    renormalise_prepare, type_coercer,
};
use std::env;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

enum Command {
    Export,
    Import,
}

struct Args {
    command: Command,
    database: String,
    table: String,
    file: Option<String>,
    schema: Option<String>,
    dialect: Dialect,
    outer_join: bool,
    keep_id: bool,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <export|import> <database.sqlite> <table> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --file <path>     CSV file (default: stdout for export, stdin for import)");
    eprintln!("  -s, --schema <path>   Load the schema from a DDL file instead of the database");
    eprintln!("  -d, --dialect <name>  DDL dialect: auto, generic, postgres, mysql (default: auto)");
    eprintln!("      --outer-join      Export rows whose foreign key matches nothing");
    eprintln!("      --keep-id         Keep the _id suffix on denormalised column names");
    process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("csvnorm");

    if args.len() < 4 {
        usage(program);
    }

    let command = match args[1].as_str() {
        "export" => Command::Export,
        "import" => Command::Import,
        other => {
            eprintln!("Unknown command: {}", other);
            usage(program);
        }
    };

    let mut parsed = Args {
        command,
        database: args[2].clone(),
        table: args[3].clone(),
        file: None,
        schema: None,
        dialect: Dialect::Auto,
        outer_join: false,
        keep_id: false,
    };

    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--file" => {
                i += 1;
                if i < args.len() {
                    parsed.file = Some(args[i].clone());
                }
            }
            "-s" | "--schema" => {
                i += 1;
                if i < args.len() {
                    parsed.schema = Some(args[i].clone());
                }
            }
            "-d" | "--dialect" => {
                i += 1;
                if i < args.len() {
                    parsed.dialect = Dialect::from_str(&args[i]).unwrap_or_else(|| {
                        eprintln!("Invalid dialect: {}", args[i]);
                        process::exit(1);
                    });
                }
            }
            "--outer-join" => parsed.outer_join = true,
            "--keep-id" => parsed.keep_id = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    parsed
}

fn load_schema(args: &Args, session: &SqliteSession) -> csvnorm::Result<Schema> {
    match &args.schema {
        Some(path) => Ok(parse_sql(&fs::read_to_string(path)?, args.dialect)?),
        None => session.reflect_schema(),
    }
}

fn export(
    args: &Args,
    session: &SqliteSession,
    schema: &Schema,
    options: &NormaliseOptions,
) -> csvnorm::Result<()> {
    let table = schema.require_table(&args.table)?;
    let query = denormalise_prepare(schema, table, options)?;
    let rows = query.fetch(session)?;
    match &args.file {
        Some(path) => write_csv(BufWriter::new(File::create(path)?), &query.column_names, &rows)?,
        None => write_csv(io::stdout().lock(), &query.column_names, &rows)?,
    }
    info!(table = %table.name, rows = rows.len(), "exported");
    Ok(())
}

fn import(
    args: &Args,
    session: &SqliteSession,
    schema: &Schema,
    options: &NormaliseOptions,
) -> csvnorm::Result<()> {
    let table = schema.require_table(&args.table)?;
    let rows = match &args.file {
        Some(path) => read_csv(BufReader::new(File::open(path)?))?,
        None => read_csv(io::stdin().lock())?,
    };

    let pipeline = renormalise_prepare(session, schema, table, options)?
        .then(empty_deleter(table))
        .then(type_coercer(table));

    let count = rows.len();
    let tx = session.transaction()?;
    for row in rows {
        let row = pipeline.transform(row)?;
        session.insert(&table.name, &row)?;
    }
    tx.commit()?;
    info!(table = %table.name, rows = count, "imported");
    Ok(())
}

fn run(args: &Args) -> csvnorm::Result<()> {
    let session = SqliteSession::open(&args.database)?;
    let schema = load_schema(args, &session)?;

    let mut options = NormaliseOptions::default();
    if args.outer_join {
        options = options.with_join(JoinKind::LeftOuter);
    }
    if args.keep_id {
        options = options.keep_names();
    }

    match args.command {
        Command::Export => export(args, &session, &schema, &options),
        Command::Import => import(args, &session, &schema, &options),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("{}: {}", args.table, e);
        process::exit(1);
    }
}
