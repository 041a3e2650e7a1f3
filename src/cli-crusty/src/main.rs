extern crate clap;
extern crate rustyline;
use clap::{App, Arg, ArgMatches};
use common::config::EngineConfig;
use common::database::Database;
use common::storage_trait::StorageTrait;
use common::CrustyError;
use env_logger::Env;
use log::{error, info};
use memstore::storage_manager::StorageManager;
use optimizer::planner::Planner;
use queryexe::metadata::MetadataManager;

use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::fs;
use std::process;
use std::sync::Arc;
use txn_manager::transactions::Transaction;

/// What the shell should do after a line.
#[derive(Debug, PartialEq)]
enum Response {
    Output(String),
    Quit,
}

/// An in-memory database and the planner over it.
struct Session {
    sm: Arc<StorageManager>,
    planner: Planner,
}

impl Session {
    fn new(config: EngineConfig) -> Self {
        let sm = Arc::new(StorageManager::new(config));
        let db = Arc::new(Database::new(String::from("crustydb")));
        let md = Arc::new(MetadataManager::new(db, Arc::clone(&sm)));
        Session {
            sm,
            planner: Planner::new(md),
        }
    }

    /// Runs one SQL statement or shell command in its own transaction.
    fn handle(&self, line: &str) -> Result<Response, CrustyError> {
        let line = line.trim();
        if line.starts_with('\\') {
            return self.handle_command(line);
        }
        self.in_transaction(|txn| {
            let res = self.planner.run(line, txn)?;
            Ok(Response::Output(res.result().to_string()))
        })
    }

    fn handle_command(&self, line: &str) -> Result<Response, CrustyError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["\\quit"] | ["\\q"] => Ok(Response::Quit),
            ["\\i", path, table] => {
                info!("Processing COMMAND::Import {} into {}", path, table);
                self.in_transaction(|txn| {
                    let count = self.planner.import_csv(path, table, txn)?;
                    Ok(Response::Output(format!(
                        "{} rows imported into {}",
                        count, table
                    )))
                })
            }
            _ => Err(CrustyError::ValidationError(format!(
                "Unknown command {}. Expected \\i FILE TABLE or \\quit",
                line
            ))),
        }
    }

    fn in_transaction<F>(&self, f: F) -> Result<Response, CrustyError>
    where
        F: FnOnce(&Transaction) -> Result<Response, CrustyError>,
    {
        let mut txn = Transaction::new();
        let result = f(&txn);
        if result.is_ok() {
            txn.commit(self.sm.as_ref());
        } else {
            txn.rollback(self.sm.as_ref());
        }
        result
    }
}

/// Prints the outcome of a line. Returns false when the shell should stop.
fn report(result: Result<Response, CrustyError>) -> bool {
    match result {
        Ok(Response::Output(s)) => {
            println!("{}", s);
            true
        }
        Ok(Response::Quit) => {
            info!("Received Quit Command");
            false
        }
        Err(e) => {
            println!("{}", e);
            true
        }
    }
}

fn process_cli_input(session: &Session, history_file: &str) {
    let mut rl = Editor::<()>::new();
    if rl.load_history(history_file).is_err() {
        info!("No previous history.");
    }
    let prompt: &str = "[crustydb]>>";
    let mut cont = true;
    while cont {
        let readline = rl.readline(prompt);
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());
                cont = report(session.handle(line.trim_end_matches(';')));
            }
            Err(ReadlineError::Interrupted) => {
                info!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                info!("CTRL-D");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }
    if let Err(e) = rl.save_history(history_file) {
        error!("Could not save history to {}: {:?}", history_file, e);
    }
}

/// Runs a semicolon delimited script, stopping at the first failure.
fn process_script_input(session: &Session, script: &str) -> Result<(), CrustyError> {
    for line in script.split(';') {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let clean_command = command.replace("\n", " ");
        info!("Script clean command: {}", clean_command);
        match session.handle(&clean_command)? {
            Response::Output(s) => println!("{}", s),
            Response::Quit => break,
        }
    }
    Ok(())
}

fn parse_usize(matches: &ArgMatches, name: &str) -> Result<Option<usize>, CrustyError> {
    match matches.value_of(name) {
        Some(v) => v.parse::<usize>().map(Some).map_err(|_| {
            CrustyError::ValidationError(format!("--{} expects a number, got {}", name, v))
        }),
        None => Ok(None),
    }
}

/// Config file settings, overridden by command line flags.
fn load_config(matches: &ArgMatches) -> Result<EngineConfig, CrustyError> {
    let mut config = match matches.value_of("config") {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(buffers) = parse_usize(matches, "buffers")? {
        config.buffer_pool_size = buffers;
    }
    if let Some(page_size) = parse_usize(matches, "page-size")? {
        config.page_size = page_size;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    // Configure log environment
    env_logger::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("buffers")
                .short("b")
                .long("buffers")
                .value_name("N")
                .help("Buffers available to each query")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("page-size")
                .short("p")
                .long("page-size")
                .value_name("BYTES")
                .help("Size of a storage block")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("script")
                .short("s")
                .long("script")
                .value_name("CRUSTY_SCRIPT")
                .help("Takes in a semicolon delimited file of crusty commands and SQL queries.")
                .takes_value(true)
                .required(false),
        )
        .get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    info!("Starting crustydb with config: {:?}", config);
    let history_file = config.history_file.clone();
    let session = Session::new(config);

    match matches.value_of("script") {
        Some(path) => {
            let result = fs::read_to_string(path)
                .map_err(CrustyError::from)
                .and_then(|script| process_script_input(&session, &script));
            if let Err(e) = result {
                error!("Script failed: {}", e);
                process::exit(1);
            }
        }
        None => process_cli_input(&session, &history_file),
    }
    info!("Terminated.");
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::*;
    use std::io::Write;

    fn output(session: &Session, line: &str) -> String {
        match session.handle(line).unwrap() {
            Response::Output(s) => s,
            Response::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_statements_and_commands() {
        init();
        let session = Session::new(EngineConfig::default());
        output(&session, "create table t (a int, b varchar(4))");
        let out = output(&session, "insert into t values (1, 'x'), (2, 'y')");
        assert_eq!("2 rows affected", out);
        assert!(output(&session, "select b from t where a = 2").contains('y'));
        assert_eq!(Response::Quit, session.handle("\\quit").unwrap());
        assert!(session.handle("\\nope").is_err());
        assert!(session.handle("select z from t").is_err());
    }

    #[test]
    fn test_import_and_script() {
        init();
        let session = Session::new(EngineConfig::default());
        let mut path = gen_random_dir();
        fs::create_dir_all(&path).unwrap();
        path.push("t.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "1,2\n3,4").unwrap();
        let script = format!(
            "create table t (a int, b int);\n\\i {} t;\nselect a from t;",
            path.display()
        );
        process_script_input(&session, &script).unwrap();
        assert!(output(&session, "select sum(b) from t").contains('6'));
        assert!(process_script_input(&session, "select q from t;").is_err());
    }
}
