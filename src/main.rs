//! Terminal Quest
//!
//! A simulated shell where you learn the command line by completing
//! missions, earning experience and climbing the ranks.

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, stdout, BufRead, IsTerminal, Write};
use terminal_quest::shell::{OutputLine, OutputSink};
use terminal_quest::tui::App;
use terminal_quest::{SessionInterpreter, ShellConfig};

/// Writes output lines straight to stdout, for piped sessions
struct StdoutSink<W: Write> {
    out: W,
}

impl<W: Write> OutputSink for StdoutSink<W> {
    fn emit(&mut self, line: OutputLine) {
        if let Err(err) = writeln!(self.out, "{}", line.text) {
            warn!("failed to write output: {}", err);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = ShellConfig::from_env()?;
    let session = SessionInterpreter::new(config);

    if io::stdin().is_terminal() {
        run_tui(session)?;
    } else {
        run_lines(session)?;
    }
    Ok(())
}

/// Read commands line by line from stdin
fn run_lines(mut session: SessionInterpreter) -> anyhow::Result<()> {
    info!("stdin is not a terminal, running in line mode");
    let mut sink = StdoutSink { out: stdout().lock() };
    for line in io::stdin().lock().lines() {
        session.submit_line(&line?, &mut sink);
    }
    sink.out.flush()?;
    Ok(())
}

fn run_tui(session: SessionInterpreter) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);
    let result = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    let progress = app.session.missions().progress();
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Thanks for playing Terminal Quest!                    ║");
    println!("╚════════════════════════════════════════════════════════╝");
    println!(
        "  Level {} | {} | {} XP | {} missions completed\n",
        progress.level,
        progress.rank,
        progress.xp,
        progress.completed_missions.len()
    );
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    while app.running {
        terminal.draw(|frame| {
            app.render(frame);
        })?;

        if !app.handle_input()? {
            break;
        }
    }
    Ok(())
}
