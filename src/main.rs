// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::io::{self, BufRead, Write};
use tracing::info;
use zeroize::Zeroizing;

use eyewear_inventory::chart::render_text;
use eyewear_inventory::{
    answerer_from_config, init_tracing, shared_table, Config, Interaction, Outcome,
    SessionContext, SessionState,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // The TUI owns the terminal; log only in the line-oriented modes
    if args.len() > 1 {
        init_tracing();
    }

    let config = Config::from_env().context("Invalid configuration")?;
    info!(?config, "configuration loaded");

    match args.get(1).map(String::as_str) {
        Some("summary") => run_summary(&config),
        Some("ask") => {
            let question = args[2..].join(" ");
            run_ask(&config, &question)
        }
        Some(other) => bail!("unknown command {:?} (expected: summary, ask <question>)", other),
        None => run_ui_mode(&config),
    }
}

/// One line, without its line ending, in a buffer wiped on drop.
/// None at end of input.
fn read_password_line(reader: &mut impl BufRead) -> Result<Option<Zeroizing<String>>> {
    let mut line = Zeroizing::new(String::new());
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(Some(line))
}

/// Read the password without echoing it when stdin is a terminal
#[cfg(feature = "tui")]
fn read_password() -> Result<Option<Zeroizing<String>>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() {
        return read_password_line(&mut io::stdin().lock());
    }

    enable_raw_mode()?;
    let result = (|| -> Result<Option<Zeroizing<String>>> {
        let mut password = Zeroizing::new(String::new());
        loop {
            let key = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key,
                _ => continue,
            };
            match key.code {
                KeyCode::Enter => return Ok(Some(password)),
                KeyCode::Esc => return Ok(None),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None)
                }
                KeyCode::Backspace => {
                    password.pop();
                }
                KeyCode::Char(c) => password.push(c),
                _ => {}
            }
        }
    })();
    disable_raw_mode()?;
    println!();

    result
}

#[cfg(not(feature = "tui"))]
fn read_password() -> Result<Option<Zeroizing<String>>> {
    read_password_line(&mut io::stdin().lock())
}

/// Prompt for the password on stdin until the session unlocks
fn unlock_from_stdin(state: &mut SessionState, ctx: &SessionContext<'_>) -> Result<()> {
    loop {
        print!("Password: ");
        io::stdout().flush()?;

        let Some(mut password) = read_password()? else {
            bail!("no password given");
        };
        let credential = std::mem::take(&mut *password);

        match state.dispatch(ctx, Interaction::SubmitCredential(credential))? {
            Outcome::Unlocked => return Ok(()),
            _ => println!("❌ Incorrect password"),
        }
    }
}

fn run_summary(config: &Config) -> Result<()> {
    let table = shared_table(&config.csv_path)?;
    let ctx = SessionContext { table, answerer: None };
    let mut state = SessionState::new(config.password.clone(), &config.default_brand);

    unlock_from_stdin(&mut state, &ctx)?;

    let view = match state.dispatch(&ctx, Interaction::View)? {
        Outcome::Dashboard(view) => view,
        other => bail!("unexpected outcome {:?}", other),
    };

    println!("\n👓 Glasses Frames Inventory Dashboard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Sort by: {}", view.sort_label);
    println!("Brands:  {}\n", view.selected_brands.join(", "));

    for chart in [&view.filtered_chart, &view.frame_type_chart, &view.brand_chart] {
        println!("{}", render_text(chart, 40));
    }

    let stats = &view.statistics;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Frames:     {}", stats.total_inventory);
    println!("Average Price:    {}", stats.average_price_display());
    println!("Number of Brands: {}", stats.brand_count);

    Ok(())
}

fn run_ask(config: &Config, question: &str) -> Result<()> {
    let table = shared_table(&config.csv_path)?;
    let answerer = answerer_from_config(config)?;
    let ctx = SessionContext { table, answerer: answerer.as_ref() };
    let mut state = SessionState::new(config.password.clone(), &config.default_brand);

    unlock_from_stdin(&mut state, &ctx)?;

    match state.dispatch(&ctx, Interaction::Ask(question.to_string())) {
        Ok(Outcome::Answer(answer)) => println!("{}", answer),
        Ok(other) => bail!("unexpected outcome {:?}", other),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Glasses Frames Inventory Dashboard...\n");

    let table = shared_table(&config.csv_path)?;
    let answerer = answerer_from_config(config)?;
    if answerer.is_none() {
        println!("ℹ️  LLM_API_KEY not set - questions are disabled");
    }

    let ctx = SessionContext { table, answerer: answerer.as_ref() };
    let session = SessionState::new(config.password.clone(), &config.default_brand);

    println!("✓ Loaded {} records\n", table.len());

    let mut app = ui::App::new(ctx, session);
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: eyewear-inventory summary");
    std::process::exit(1);
}
