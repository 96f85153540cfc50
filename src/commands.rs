//! Command execution.

use crate::config::{Config, SimulationConfig};
use crate::Commands;
use colored::Colorize;
use petrinet_core::{CoreError, Declaration, Event, FireResult, Net, Stream, DECLARATION_VERSION};
use serde_json::Value;
use std::error::Error;
use std::path::Path;

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands, config: &Config) -> Result<String, Box<dyn Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),

        Commands::Validate { file } => {
            let net = load_net(&file, &config.simulation)?;
            let checksum = net.to_declaration().checksum().map_err(coded)?;
            Ok(format!(
                "{} {} ({}): {} places, {} transitions, {} arcs (checksum: {})",
                "Valid".green(),
                net.schema().cyan(),
                net.net_type(),
                net.place_count(),
                net.transition_count(),
                net.arcs().len(),
                checksum
            ))
        }

        Commands::Show { file } => {
            let net = load_net(&file, &config.simulation)?;
            Ok(format_net(&net))
        }

        Commands::Enabled { file } => {
            let net = load_net(&file, &config.simulation)?;
            Ok(format_enabled(&net, &net.initial_vector()))
        }

        Commands::Fire {
            file,
            actions,
            multiple,
        } => {
            let net = load_net(&file, &config.simulation)?;
            let schema = net.schema().to_string();
            let multiple = multiple.unwrap_or(config.simulation.default_multiple);
            let mut stream: Stream<Event> = Stream::new([net]);

            let mut output = String::new();
            for (i, action) in actions.iter().enumerate() {
                let event = Event::new(schema.as_str(), action.as_str()).with_multiple(multiple);
                let result = stream.dispatch(event).map_err(coded)?;
                output.push_str(&format!("[{}] {}\n", i, format_result(action, &result)));
            }

            let state = stream.state(&schema).map_err(coded)?;
            let net = stream.model(&schema).map_err(coded)?;
            output.push_str(&format!(
                "{} accepted, {} rejected\n{}",
                stream.seq(),
                actions.len() as u64 - stream.seq(),
                format_state(net, &state)
            ));
            Ok(output)
        }

        Commands::Export { file, full } => {
            let net = load_net(&file, &config.simulation)?;
            export(&net, full)
        }
    }
}

/// Reads a declaration file and builds a net named after the file stem.
pub fn load_net(path: &Path, sim: &SimulationConfig) -> Result<Net, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let mut decl: Declaration =
        serde_json::from_str(&content).map_err(|e| coded(CoreError::from(e)))?;

    if let Err(e) = decl.check_version() {
        if sim.strict_version {
            return Err(coded(e));
        }
        tracing::warn!("{}: {}, loading anyway", path.display(), e);
        decl.version = DECLARATION_VERSION.to_string();
    }

    let schema = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("net");
    Net::from_declaration(schema, &decl).map_err(|e| {
        if e.is_construction_error() {
            format!("failed to load '{}': [{}] {}", path.display(), e.error_code(), e).into()
        } else {
            coded(e)
        }
    })
}

/// Prefixes a core error with its error code.
pub fn coded(e: CoreError) -> Box<dyn Error> {
    format!("[{}] {}", e.error_code(), e).into()
}

pub fn export(net: &Net, full: bool) -> Result<String, Box<dyn Error>> {
    let value = if full {
        net.to_full_object().map_err(coded)?
    } else {
        net.to_declaration().to_json().map_err(coded)?
    };
    Ok(format_json(&value))
}

pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn format_vector(v: &[i64]) -> String {
    let items: Vec<String> = v.iter().map(|n| n.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Labeled marking, e.g. `foo=1 bar=0`.
pub fn format_state(net: &Net, state: &[i64]) -> String {
    let marks: Vec<String> = net
        .places()
        .map(|p| {
            let tokens = state.get(p.offset).copied().unwrap_or(0);
            let mark = format!("{}={}", p.label, tokens);
            if tokens > 0 {
                mark.yellow().to_string()
            } else {
                mark
            }
        })
        .collect();
    format!("State: {}", marks.join(" "))
}

pub fn format_result(action: &str, result: &FireResult) -> String {
    let status = if result.ok {
        "ok".green()
    } else {
        "rejected".red()
    };

    let mut flags = Vec::new();
    if result.inhibited {
        flags.push("inhibited");
    }
    if result.overflow {
        flags.push("overflow");
    }
    if result.underflow {
        flags.push("underflow");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };

    format!(
        "{} {} (role: {}){} {}",
        action.cyan(),
        status,
        result.role,
        flags.dimmed(),
        format_vector(&result.out)
    )
}

pub fn format_enabled(net: &Net, state: &[i64]) -> String {
    let enabled = net.enabled_transitions(state);
    if enabled.is_empty() {
        return "No transitions enabled".yellow().to_string();
    }
    let labels: Vec<String> = enabled.iter().map(|t| t.cyan().to_string()).collect();
    format!("Enabled: {}", labels.join(", "))
}

pub fn format_net(net: &Net) -> String {
    let (width, height) = net.size();
    let mut output = format!(
        "{} ({}, {}x{})\n",
        format!("Net {}", net.schema()).bold(),
        net.net_type(),
        width,
        height
    );

    output.push_str(&format!("{}\n", "Places:".bold()));
    for p in net.places() {
        output.push_str(&format!(
            "  [{}] {} initial={} capacity={}\n",
            p.offset,
            p.label.cyan(),
            p.initial,
            if p.capacity == 0 {
                "unbounded".to_string()
            } else {
                p.capacity.to_string()
            }
        ));
    }

    output.push_str(&format!("{}\n", "Transitions:".bold()));
    for t in net.transitions() {
        output.push_str(&format!(
            "  {} role={} delta={}{}\n",
            t.label.cyan(),
            t.role.as_str(),
            format_vector(&t.delta),
            if t.allow_reentry { " reentry" } else { "" }
        ));
        for g in t.guards.values() {
            let threshold = g.threshold().map(|(_, w)| -w).unwrap_or(0);
            output.push_str(&format!(
                "    {} {} >= {}\n",
                if g.inverted { "requires" } else { "inhibited by" },
                g.label.yellow(),
                threshold
            ));
        }
    }

    output.push_str(&format!("{}\n", "Arcs:".bold()));
    for a in net.arcs() {
        let kind = if a.reentry {
            " (reentry)"
        } else if a.inhibit {
            " (inhibitor)"
        } else {
            ""
        };
        output.push_str(&format!(
            "  [{}] {} -> {} weight={}{}\n",
            a.offset,
            a.source.label(),
            a.target.label(),
            a.weight,
            kind
        ));
    }

    output
}
