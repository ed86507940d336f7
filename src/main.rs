mod app;
mod cli;
mod config;
mod domain;
mod engine;
mod error;
mod gateway;
mod locks;
mod logging;
mod normalize;
mod reorder;
mod store;
#[cfg(test)]
mod test_support;
mod ui;
mod wire;

use std::io::Read;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        if let app::AppError::Sync(sync) = &err {
            if sync.is_retryable() {
                eprintln!("hint: the change was rolled back; rerun once the store is reachable");
            }
        }
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        let mut cmd = cli::styled_command();
        clap_complete::generate(args.shell, &mut cmd, "stockgrid", &mut std::io::stdout());
        return Ok(());
    }

    let config = config::Config::load(&cli.root, cli.config.as_deref(), cli.overrides())?;
    logging::init(config.log_filter.as_deref(), cli.verbose);
    tracing::debug!(
        backend = %config.backend,
        store = %config.store_path.display(),
        "configuration loaded"
    );

    match &cli.command {
        Commands::Presets(args) => {
            let catalog = domain::presets::catalog();
            if args.json {
                print_json(&catalog);
            } else {
                ui::print_presets(&catalog);
            }
            return Ok(());
        }
        Commands::Wire(args) => {
            let store = app::open_store(&config)?;
            let mut body = Vec::new();
            std::io::stdin().read_to_end(&mut body)?;
            let response = wire::handle(&store, &args.method, &args.path, &body);
            print_json(&response);
            return Ok(());
        }
        _ => {}
    }

    let app = app::App::open(config)?;

    match cli.command {
        Commands::Show(args) => {
            let matrix = app.matrix();
            match args.bay {
                Some(bay) => {
                    let bay: domain::Bay = bay.parse().map_err(error::SyncError::from)?;
                    if args.json {
                        print_json(matrix.column(bay));
                    } else {
                        ui::print_bay(matrix.column(bay));
                    }
                }
                None if args.json => print_json(&*matrix),
                None => ui::print_grid(&matrix),
            }
        }
        Commands::Cell(args) => {
            let cell = app.cell(&args.at.bay, &args.at.level)?;
            if args.json {
                print_json(&cell);
            } else {
                ui::print_cell(&cell);
            }
        }
        Commands::Save(args) => {
            let items = match args.items {
                Some(raw) => app::parse_items(&raw)?,
                None => vec![app::build_item(app::ItemInput {
                    size: args.size.unwrap_or_default(),
                    length_mm: args.length.unwrap_or_default(),
                    pieces: args.pieces.unwrap_or_default(),
                    grade: args.grade,
                    treatment: args.treatment,
                    bundle_id: args.bundle,
                    note: args.note,
                })?],
            };
            let matrix = app.save(&args.at.bay, &args.at.level, items, args.move_to_top)?;
            let bay: domain::Bay = args.at.bay.parse().map_err(error::SyncError::from)?;
            if args.move_to_top {
                ui::print_bay(matrix.column(bay));
            } else {
                let level: domain::Level = args.at.level.parse().map_err(error::SyncError::from)?;
                match matrix.cell(bay, level) {
                    Some(cell) => ui::print_cell(cell),
                    None => println!("saved {}/{}", bay, level),
                }
            }
        }
        Commands::Clear(args) => {
            app.clear(&args.bay, &args.level)?;
            println!(
                "cleared {}/{}",
                args.bay.trim().to_ascii_uppercase(),
                args.level.trim().to_ascii_uppercase()
            );
        }
        Commands::Reorder(args) => {
            let matrix = app.reorder(&args.bay, &args.order)?;
            let bay: domain::Bay = args.bay.parse().map_err(error::SyncError::from)?;
            ui::print_bay(matrix.column(bay));
        }
        Commands::Import(args) => {
            let matrix = app.import(&args.file)?;
            println!(
                "imported {} occupied cell(s) from {}",
                matrix.occupied_count(),
                args.file.display()
            );
        }
        Commands::Summary(args) => {
            let summary = app.summary();
            if args.json {
                print_json(&summary);
            } else {
                ui::print_summary(&summary);
            }
        }
        Commands::Presets(_) | Commands::Wire(_) | Commands::Completions(_) => {
            unreachable!("handled before the matrix is loaded")
        }
    }

    Ok(())
}
