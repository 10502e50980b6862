use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use chess_history::analysis::{AnalysisSession, UciInfo};
use chess_history::config::AppConfig;
use chess_history::engine::{pgn, GameEngine, Navigation, SavedGame};

const HELP: &str = "\
commands:
  move <m> | <m>     play a move (SAN or coordinate)
  first | last | next | prev
  jump <halfmove>    0 is the starting position
  fen | board | moves | pgn
  new [fen]          start a new game
  save <file>        write the game as JSON
  open <file>        read a JSON game or a .pgn file
  analyse            ask the configured UCI engine
  help | quit";

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Move(String),
    First,
    Last,
    Next,
    Prev,
    Jump(u32),
    Fen,
    Board,
    Moves,
    Pgn,
    New(Option<String>),
    Save(String),
    Open(String),
    Analyse,
    Help,
    Quit,
    Empty,
}

impl Command {
    fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = |name: &str| {
            if rest.is_empty() {
                Err(format!("{name} needs an argument"))
            } else {
                Ok(rest.to_string())
            }
        };

        Ok(match word.to_lowercase().as_str() {
            "" => Command::Empty,
            "move" | "m" => Command::Move(arg("move")?),
            "first" => Command::First,
            "last" => Command::Last,
            "next" | "n" => Command::Next,
            "prev" | "previous" | "p" => Command::Prev,
            "jump" | "j" => Command::Jump(
                arg("jump")?
                    .parse()
                    .map_err(|_| format!("not a halfmove number: {rest}"))?,
            ),
            "fen" => Command::Fen,
            "board" | "b" => Command::Board,
            "moves" => Command::Moves,
            "pgn" => Command::Pgn,
            "new" => Command::New((!rest.is_empty()).then(|| rest.to_string())),
            "save" => Command::Save(arg("save")?),
            "open" | "load" => Command::Open(arg("open")?),
            "analyse" | "analyze" => Command::Analyse,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            // Bare move text.
            _ if rest.is_empty() => Command::Move(word.to_string()),
            _ => return Err(format!("unknown command: {word}")),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env();

    // Logs go to stderr so stdout stays clean for command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!(
        "chess-history v{} ({:?} notation, strict turns: {})",
        env!("CARGO_PKG_VERSION"),
        config.notation,
        config.strict_turns
    );

    let mut engine = GameEngine::from_config(&config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(&mut engine, &config, command).await {
                    eprintln!("error: {e}");
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

async fn execute(
    engine: &mut GameEngine,
    config: &AppConfig,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{HELP}"),
        Command::Move(text) => {
            let gm = engine.play(&text)?;
            let dots = if gm.is_white() { "." } else { "..." };
            println!("{}{dots} {}", gm.movenum(), gm.san());
        }
        Command::First => {
            let nav = engine.first();
            show(engine, Some(nav));
        }
        Command::Last => {
            let nav = engine.last();
            show(engine, nav);
        }
        Command::Next => {
            let nav = engine.next();
            show(engine, nav);
        }
        Command::Prev => {
            let nav = engine.previous();
            show(engine, nav);
        }
        Command::Jump(halfmove) => {
            let nav = engine.jump_to_halfmove(halfmove)?;
            show(engine, Some(nav));
        }
        Command::Fen => println!("{}", engine.to_fen()),
        Command::Board => println!("{}", engine.position()),
        Command::Moves => print_moves(engine),
        Command::Pgn => print!("{}", pgn::to_pgn(engine)),
        Command::New(fen) => {
            engine.new_game(fen.as_deref())?;
            println!("{}", engine.to_fen());
        }
        Command::Save(path) => {
            let json = serde_json::to_string_pretty(&engine.saved_game())?;
            tokio::fs::write(&path, json).await?;
            println!("saved {} moves to {path}", engine.history().len());
        }
        Command::Open(path) => {
            let text = tokio::fs::read_to_string(&path).await?;
            let n = if path.ends_with(".pgn") {
                let fen = pgn::tags(&text)
                    .into_iter()
                    .find(|(name, _)| name == "FEN")
                    .map(|(_, value)| value);
                let tokens = pgn::movetext_tokens(&text);
                let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
                engine.load_san(fen.as_deref(), &tokens)?
            } else {
                let saved: SavedGame = serde_json::from_str(&text)?;
                engine.load_saved(&saved)?
            };
            println!("loaded {n} moves from {path}");
        }
        Command::Analyse => analyse(engine, config).await?,
    }
    Ok(())
}

fn show(engine: &GameEngine, nav: Option<Navigation>) {
    match nav {
        Some(nav) => {
            let label = engine
                .current_move()
                .map(|gm| gm.san().to_string())
                .unwrap_or_else(|| "start".to_string());
            println!("{label} [{} {:+}]", nav.replay.kind(), nav.diff);
            println!("{}", engine.position());
        }
        None => println!("(no move)"),
    }
}

fn print_moves(engine: &GameEngine) {
    let history = engine.history();
    if history.is_empty() {
        println!("(no moves)");
        return;
    }
    for (i, gm) in history.entries().iter().enumerate() {
        let marker = if history.cursor() == Some(i) { '*' } else { ' ' };
        let dots = if gm.is_white() { "." } else { "..." };
        println!(
            "{marker} {:>3} {}{dots} {:<8} {}",
            gm.halfmove(),
            gm.movenum(),
            gm.san(),
            gm.algebraic()
        );
    }
}

async fn analyse(engine: &GameEngine, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let path = config
        .engine_path
        .as_deref()
        .ok_or("no analysis engine configured (set CHESS_ENGINE_PATH)")?;
    let timeout = Duration::from_millis(config.analysis_timeout_ms);
    let mut session = AnalysisSession::spawn(path, timeout).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<UciInfo>();
    let printer = tokio::spawn(async move {
        while let Some(info) = rx.recv().await {
            if info.pv.is_empty() {
                continue;
            }
            println!("  {info}");
        }
    });

    let result = session
        .analyse(engine.position(), config.analysis_depth, &tx)
        .await;
    drop(tx);
    printer.await?;
    let best = result?;
    println!("{best}");
    session.quit().await?;
    Ok(())
}
