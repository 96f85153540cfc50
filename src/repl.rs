//! Interactive REPL.

use crate::commands::{
    coded, export, format_enabled, format_json, format_net, format_result, format_state,
    format_vector, load_net,
};
use crate::config::Config;
use colored::Colorize;
use petrinet_core::{Net, NetType, Position, Vector};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::error::Error;
use std::path::Path;

const HELP_TEXT: &str = r#"
Available commands:
  help                              Show this help

  load <file>                       Load a declaration
  new [type] [schema]               Start an empty net (petriNet, elementary, workflow)
  show                              Show places, transitions and arcs
  export [full]                     Print the net as JSON
  save <file>                       Write the sparse declaration to a file

  state                             Show the current marking
  enabled                           List transitions enabled in the current marking
  fire <action> [multiple]          Fire a transition
  test <action> [multiple]          Evaluate a firing without applying it
  push <action> [multiple]          Fire as an OR-branch (no workflow checks)
  history                           List accepted firings
  reset                             Return to the initial marking

  add-place [x y]                   Add a place
  add-transition [x y]              Add a transition
  add-arc <src> <tgt> [w] [inhibit] Add an arc
  delete-place <label>              Delete a place and its arcs
  delete-transition <label>         Delete a transition and its arcs
  delete-arc <offset>               Delete an arc
  rename-place <old> <new>          Rename a place
  rename-transition <old> <new>     Rename a transition
  toggle <offset>                   Toggle an arc between normal and inhibitor
  weight <offset> <weight>          Set an arc weight
  label <base>                      Suggest a free label

  quit, exit                        Exit the REPL
"#;

/// A net with a working marking.
struct Session {
    net: Net,
    state: Vector,
    history: Vec<(u64, String, i64)>,
    default_multiple: i64,
}

impl Session {
    fn new(net: Net, default_multiple: i64) -> Self {
        let state = net.initial_vector();
        Self {
            net,
            state,
            history: Vec::new(),
            default_multiple,
        }
    }

    fn reset(&mut self) {
        self.state = self.net.initial_vector();
        self.history.clear();
    }

    fn multiple(&self, arg: Option<&&str>) -> Result<i64, Box<dyn Error>> {
        let multiple = match arg {
            Some(s) => s.parse()?,
            None => self.default_multiple,
        };
        if multiple <= 0 {
            return Err(format!("multiple must be positive, got {}", multiple).into());
        }
        Ok(multiple)
    }
}

pub fn run(config: &Config, file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    println!("{}", "petrinet REPL".bold().cyan());

    let net = match file {
        Some(path) => {
            let net = load_net(path, &config.simulation)?;
            println!("Loaded {} from {}", net.schema().cyan(), path.display());
            net
        }
        None => Net::new("scratch", NetType::General),
    };
    let mut session = Session::new(net, config.simulation.default_multiple);

    // Create readline editor
    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    let history_path = config.repl.history_path();
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", config.repl.prompt.cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut session, config, line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    Ok(())
}

fn execute_repl_command(
    session: &mut Session,
    config: &Config,
    line: &str,
) -> Result<Option<String>, Box<dyn Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "load" | "l" => {
            if args.is_empty() {
                return Ok(Some("Usage: load <file>".to_string()));
            }
            let net = load_net(Path::new(args[0]), &config.simulation)?;
            let summary = format!(
                "{} {} ({} places, {} transitions)",
                "Loaded".green(),
                net.schema().cyan(),
                net.place_count(),
                net.transition_count()
            );
            *session = Session::new(net, session.default_multiple);
            Ok(Some(summary))
        }

        "new" => {
            let net_type: NetType = match args.first() {
                Some(s) => s.parse()?,
                None => NetType::General,
            };
            let schema = args.get(1).copied().unwrap_or("scratch");
            *session = Session::new(Net::new(schema, net_type), session.default_multiple);
            Ok(Some(format!(
                "{} {} net {}",
                "Created".green(),
                net_type,
                schema.cyan()
            )))
        }

        "show" | "s" => Ok(Some(format_net(&session.net))),

        "export" => {
            let full = args.first().map(|a| *a == "full").unwrap_or(false);
            Ok(Some(export(&session.net, full)?))
        }

        "save" => {
            if args.is_empty() {
                return Ok(Some("Usage: save <file>".to_string()));
            }
            let json = session.net.to_declaration().to_json().map_err(coded)?;
            std::fs::write(args[0], format_json(&json))?;
            Ok(Some(format!("{} {}", "Saved".green(), args[0])))
        }

        "state" => Ok(Some(format!(
            "{} {}",
            format_state(&session.net, &session.state),
            format_vector(&session.state).dimmed()
        ))),

        "enabled" | "e" => Ok(Some(format_enabled(&session.net, &session.state))),

        "fire" | "f" => {
            if args.is_empty() {
                return Ok(Some("Usage: fire <action> [multiple]".to_string()));
            }
            let multiple = session.multiple(args.get(1))?;
            let action = args[0];
            let result = session
                .net
                .fire(&mut session.state, action, multiple)
                .map_err(coded)?;
            if result.ok {
                let seq = session.history.len() as u64;
                session.history.push((seq, action.to_string(), multiple));
            }
            Ok(Some(format!(
                "{}\n{}",
                format_result(action, &result),
                format_state(&session.net, &session.state)
            )))
        }

        "test" | "t" => {
            if args.is_empty() {
                return Ok(Some("Usage: test <action> [multiple]".to_string()));
            }
            let multiple = session.multiple(args.get(1))?;
            let result = session
                .net
                .evaluate(&session.state, args[0], multiple)
                .map_err(coded)?;
            Ok(Some(format_result(args[0], &result)))
        }

        "push" => {
            if args.is_empty() {
                return Ok(Some("Usage: push <action> [multiple]".to_string()));
            }
            let multiple = session.multiple(args.get(1))?;
            let action = args[0];
            let result = session
                .net
                .push_state(&mut session.state, action, multiple)
                .map_err(coded)?;
            if result.ok {
                let seq = session.history.len() as u64;
                session.history.push((seq, action.to_string(), multiple));
            }
            Ok(Some(format!(
                "{}\n{}",
                format_result(action, &result),
                format_state(&session.net, &session.state)
            )))
        }

        "history" | "h" => {
            if session.history.is_empty() {
                return Ok(Some("No firings".yellow().to_string()));
            }
            let mut output = String::new();
            for (seq, action, multiple) in &session.history {
                output.push_str(&format!(
                    "[{}] {} x{}\n",
                    seq.to_string().cyan(),
                    action.yellow(),
                    multiple
                ));
            }
            Ok(Some(output))
        }

        "reset" => {
            session.reset();
            Ok(Some(format_state(&session.net, &session.state)))
        }

        "add-place" | "ap" => {
            let position = parse_position(args)?;
            let label = session.net.add_place(position);
            session.reset();
            Ok(Some(format!("{} place {}", "Added".green(), label.cyan())))
        }

        "add-transition" | "at" => {
            let position = parse_position(args)?;
            let label = session.net.add_transition(position);
            Ok(Some(format!(
                "{} transition {}",
                "Added".green(),
                label.cyan()
            )))
        }

        "add-arc" | "aa" => {
            if args.len() < 2 {
                return Ok(Some(
                    "Usage: add-arc <source> <target> [weight] [inhibit]".to_string(),
                ));
            }
            let weight = match args.get(2) {
                Some(w) => w.parse()?,
                None => 1,
            };
            let inhibit = args.get(3).map(|a| *a == "inhibit").unwrap_or(false);
            let offset = session
                .net
                .add_arc(args[0], args[1], weight, inhibit)
                .map_err(coded)?;
            Ok(Some(format!(
                "{} arc [{}] {} -> {}",
                "Added".green(),
                offset,
                args[0],
                args[1]
            )))
        }

        "delete-place" | "dp" => {
            if args.is_empty() {
                return Ok(Some("Usage: delete-place <label>".to_string()));
            }
            session.net.delete_place(args[0]).map_err(coded)?;
            session.reset();
            Ok(Some(format!("{} place {}", "Deleted".green(), args[0].cyan())))
        }

        "delete-transition" | "dt" => {
            if args.is_empty() {
                return Ok(Some("Usage: delete-transition <label>".to_string()));
            }
            session.net.delete_transition(args[0]).map_err(coded)?;
            Ok(Some(format!(
                "{} transition {}",
                "Deleted".green(),
                args[0].cyan()
            )))
        }

        "delete-arc" | "da" => {
            if args.is_empty() {
                return Ok(Some("Usage: delete-arc <offset>".to_string()));
            }
            let offset: usize = args[0].parse()?;
            session.net.delete_arc(offset).map_err(coded)?;
            Ok(Some(format!("{} arc [{}]", "Deleted".green(), offset)))
        }

        "rename-place" | "rp" => {
            if args.len() < 2 {
                return Ok(Some("Usage: rename-place <old> <new>".to_string()));
            }
            session.net.rename_place(args[0], args[1]).map_err(coded)?;
            Ok(Some(format!(
                "{} {} -> {}",
                "Renamed".green(),
                args[0],
                args[1].cyan()
            )))
        }

        "rename-transition" | "rt" => {
            if args.len() < 2 {
                return Ok(Some("Usage: rename-transition <old> <new>".to_string()));
            }
            session
                .net
                .rename_transition(args[0], args[1])
                .map_err(coded)?;
            Ok(Some(format!(
                "{} {} -> {}",
                "Renamed".green(),
                args[0],
                args[1].cyan()
            )))
        }

        "toggle" => {
            if args.is_empty() {
                return Ok(Some("Usage: toggle <offset>".to_string()));
            }
            let offset: usize = args[0].parse()?;
            session.net.toggle_inhibitor(offset).map_err(coded)?;
            let inhibit = session.net.arcs()[offset].inhibit;
            Ok(Some(format!(
                "Arc [{}] is now {}",
                offset,
                if inhibit { "an inhibitor" } else { "a normal arc" }
            )))
        }

        "weight" | "w" => {
            if args.len() < 2 {
                return Ok(Some("Usage: weight <offset> <weight>".to_string()));
            }
            let offset: usize = args[0].parse()?;
            let weight: i64 = args[1].parse()?;
            session.net.set_arc_weight(offset, weight).map_err(coded)?;
            Ok(Some(format!("Arc [{}] weight = {}", offset, weight)))
        }

        "label" => {
            if args.is_empty() {
                return Ok(Some("Usage: label <base>".to_string()));
            }
            Ok(Some(session.net.new_label(args[0])))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

fn parse_position(args: &[&str]) -> Result<Position, Box<dyn Error>> {
    match args {
        [x, y, ..] => Ok(Position::new(x.parse()?, y.parse()?)),
        _ => Ok(Position::default()),
    }
}
