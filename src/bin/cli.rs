#![cfg(not(tarpaulin_include))]

use cartesian_plot::axis_store::Selection;
use cartesian_plot::config::Config;
use cartesian_plot::edit::{Commit, EditKey};
use cartesian_plot::error::{Error, Result};
use cartesian_plot::graph::{self, GraphOptions};
use cartesian_plot::http::HttpApi;
use cartesian_plot::model::{SemiAxis, TableData};
use cartesian_plot::workbench::Workbench;
use cartesian_plot::{TokenStore, downloader, logging};

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

const CELL_WIDTH: usize = 10;

/// Splits a command line on whitespace; double quotes group words.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// y/N prompt on stdin
fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn fit(text: &str) -> String {
    let shown: String = text.chars().take(CELL_WIDTH).collect();
    format!("{:>width$}", shown, width = CELL_WIDTH)
}

fn display_table(table: &TableData) {
    print!("{}", fit("name"));
    for d in &table.dimensions {
        print!(" {}", fit(&d.name));
    }
    println!("  annotation");
    for row in &table.data_points {
        print!("{}", fit(&row.name));
        for d in &table.dimensions {
            print!(" {}", fit(&row.display_value(&d.name).to_string()));
        }
        println!("  {}", row.annotation);
    }
}

fn display_axes(bench: &Workbench<HttpApi>) {
    let configs = bench.axes().configs();
    if configs.is_empty() {
        if bench.table().dimensions.len() < 4 {
            println!("No plots. Add at least 4 columns to create one.");
        } else {
            println!("No plots. Create one with: newaxis <name>");
        }
        return;
    }
    let selected = bench.axes().selection();
    for axis in configs {
        let marker = if selected == Selection::Axis(axis.id) { '*' } else { ' ' };
        let dirty = if bench.is_dirty(axis.id) { " (unsaved)" } else { "" };
        let settings = bench
            .display_settings(axis.id)
            .unwrap_or_else(|| axis.settings.clone());
        println!(
            "{marker} {:>4} {}{dirty}: x+={} x-={} y+={} y-={}",
            axis.id,
            axis.name,
            settings.x_positive.name,
            settings.x_negative.name,
            settings.y_positive.name,
            settings.y_negative.name
        );
    }
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let arg = arg.ok_or_else(|| Error::validation("missing plot id"))?;
    match Selection::from_key(arg) {
        Some(Selection::Axis(id)) => Ok(id),
        _ => arg
            .parse()
            .map_err(|_| Error::validation(format!("invalid plot id '{arg}'"))),
    }
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::validation(format!("missing {what}")))
}

fn report(commit: Commit) -> String {
    match commit {
        Commit::Nothing => "nothing to commit".to_string(),
        Commit::Unchanged => "unchanged".to_string(),
        Commit::Declined => "kept previous value".to_string(),
        Commit::Request(_) => "ok".to_string(),
    }
}

fn plot(bench: &Workbench<HttpApi>, args: &[String]) -> Result<String> {
    let id = match args.get(1) {
        Some(_) => parse_id(args.get(1))?,
        None => bench
            .axes()
            .selection()
            .id()
            .ok_or_else(|| Error::validation("no plot selected"))?,
    };
    let view = bench.plot(id)?;
    println!(
        "{}{}: x in [{}, {}], y in [{}, {}]",
        view.name,
        if view.preview { " (preview)" } else { "" },
        view.domain.x[0],
        view.domain.x[1],
        view.domain.y[0],
        view.domain.y[1]
    );
    for p in &view.projection.valid {
        println!("  {:>10} ({}, {})", graph::point_label(p), p.x, p.y);
    }
    let diagnostics = view.diagnostics();
    if !diagnostics.is_empty() {
        println!("Invalid points:");
        for line in diagnostics {
            println!("  {line}");
        }
    }

    let Some(out) = args.get(2) else {
        return Ok("ok".to_string());
    };
    let options = if args.get(3).is_some_and(|a| a == "full") {
        GraphOptions::magnified()
    } else {
        GraphOptions::default()
    };
    if out.ends_with(".png") {
        fs::write(out, graph::render_png(&view, &options)?)?;
    } else {
        fs::write(out, graph::render_svg(&view, &options)?)?;
    }
    Ok(format!("wrote {out}"))
}

fn run_command(bench: &mut Workbench<HttpApi>, args: &[String]) -> Result<String> {
    let mut confirm = |prompt: &str| ask(prompt);
    let command = args[0].as_str();

    if command == "refresh" {
        bench.refresh_all()?;
    } else if command == "addcol" {
        bench.add_column(arg(args, 1, "column name")?)?;
    } else if command == "addrow" {
        bench.add_row(arg(args, 1, "row name")?)?;
    } else if command == "delcol" {
        if !bench.delete_column(arg(args, 1, "column name")?, &mut confirm)? {
            return Ok("cancelled".to_string());
        }
    } else if command == "delrow" {
        if !bench.delete_row(arg(args, 1, "row name")?, &mut confirm)? {
            return Ok("cancelled".to_string());
        }
    } else if command == "set" {
        bench.open_cell(arg(args, 1, "row")?, arg(args, 2, "column")?)?;
        bench.input(args.get(3).map_or("", String::as_str));
        return bench.press(EditKey::Enter, &mut confirm).map(report);
    } else if command == "annotate" {
        bench.open_annotation(arg(args, 1, "row")?)?;
        bench.input(&args[2..].join(" "));
        return bench.press(EditKey::Enter, &mut confirm).map(report);
    } else if command == "rename" {
        bench.open_row_name(arg(args, 1, "row")?)?;
        bench.input(args.get(2).map_or("", String::as_str));
        return bench.press(EditKey::Enter, &mut confirm).map(report);
    } else if command == "axes" {
        display_axes(bench);
    } else if command == "select" {
        let key = arg(args, 1, "plot id")?;
        let selection = match Selection::from_key(key) {
            Some(selection) => selection,
            None => Selection::Axis(parse_id(args.get(1))?),
        };
        bench.select(selection)?;
    } else if command == "newaxis" {
        let mut draft = bench.axis_draft()?;
        draft.name = arg(args, 1, "plot name")?.to_string();
        for (axis, column) in SemiAxis::ALL.iter().zip(args.iter().skip(2)) {
            let dimension = bench
                .table()
                .dimension(column)
                .cloned()
                .ok_or_else(|| Error::validation(format!("No column named '{column}'.")))?;
            draft.settings.set_slot(*axis, dimension);
        }
        let id = bench.create_axis(&draft)?;
        return Ok(format!("created plot {id}"));
    } else if command == "renameaxis" {
        let id = parse_id(args.get(1))?;
        if !bench.rename_axis(id, &args[2..].join(" "))? {
            return Ok("unchanged".to_string());
        }
    } else if command == "slot" {
        let id = parse_id(args.get(1))?;
        let slot: SemiAxis = arg(args, 2, "semi-axis")?
            .parse()
            .map_err(Error::Validation)?;
        bench.change_axis_slot(id, slot, arg(args, 3, "column")?)?;
        return Ok("preview (save or cancel)".to_string());
    } else if command == "save" {
        return bench.save_axis().map(report);
    } else if command == "cancel" {
        bench.cancel_edit();
    } else if command == "delaxis" {
        let id = parse_id(args.get(1))?;
        if !bench.delete_axis(id, &mut confirm)? {
            return Ok("cancelled".to_string());
        }
    } else if command == "plot" {
        return plot(bench, args);
    } else if command == "export" {
        let target = args.get(1).map_or(".", String::as_str);
        let path = bench.export_to(Path::new(target))?;
        return Ok(format!("exported to {}", path.display()));
    } else if command == "import" {
        if !bench.import_from(Path::new(arg(args, 1, "file")?), &mut confirm)? {
            return Ok("cancelled".to_string());
        }
    } else if command == "csv" {
        let out = arg(args, 1, "output file")?;
        fs::write(out, downloader::to_csv(bench.table()))?;
    } else if command == "xlsx" {
        let out = arg(args, 1, "output file")?;
        fs::write(out, downloader::to_xlsx(bench.table())?)?;
    } else if command == "login" {
        bench.login(arg(args, 1, "token")?)?;
    } else if command == "logout" {
        bench.logout()?;
    } else {
        return Ok("invalid command".to_string());
    }
    Ok("ok".to_string())
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  disable_output / enable_output: Toggle the table display");
    println!("  refresh: Reload table and plots");
    println!("  addcol <name> | addrow <name> | delcol <name> | delrow <name>");
    println!("  set <row> <column> <value>: Edit a cell (blank means 0)");
    println!("  annotate <row> [text]: Edit an annotation");
    println!("  rename <row> <new name>: Rename a row");
    println!("  axes: List plots (* marks the selected one)");
    println!("  select <id|axis-id|0>: Select a plot");
    println!("  newaxis <name> [x+ x- y+ y-]: Create a plot");
    println!("  renameaxis <id> <name>: Rename a plot");
    println!("  slot <id> <x+|x-|y+|y-> <column>: Preview a semi-axis change");
    println!("  save | cancel: Save or discard the open preview");
    println!("  delaxis <id>: Delete a plot");
    println!("  plot [id] [out.svg|out.png] [full]: Show or render a plot");
    println!("  export [file|dir] | import <file>: Snapshot files (.gz supported)");
    println!("  csv <file> | xlsx <file>: Download the table");
    println!("  login <token> | logout");
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let config = Config::from_env();
    let token = TokenStore::new(config.token_path.clone()).load();
    let api = HttpApi::new(&config, token);
    let mut bench = Workbench::new(config, api);

    println!("{}", bench.greeting());
    let mut status = match bench.refresh_all() {
        Ok(()) => String::from("ok"),
        Err(e) => e.user_message(),
    };

    let mut start_time = Instant::now();
    let mut show = true;
    loop {
        if show {
            display_table(bench.table());
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        start_time = Instant::now();

        let args = split_args(&line);
        let Some(command) = args.first() else {
            status = String::from("invalid command");
            continue;
        };

        match command.as_str() {
            "q" => break,
            "help" => print_help(),
            "disable_output" => {
                show = false;
                status = String::from("ok");
            }
            "enable_output" => {
                show = true;
                status = String::from("ok");
            }
            _ => {
                status = match run_command(&mut bench, &args) {
                    Ok(message) => message,
                    Err(e) => e.user_message(),
                };
            }
        }
    }

    Ok(())
}
