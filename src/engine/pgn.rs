//! PGN (Portable Game Notation) export and movetext import.
//!
//! Export writes the Seven Tag Roster and the recorded move text of a
//! `GameEngine`. Import is limited to pulling the move tokens out of the
//! movetext so they can be replayed with `GameEngine::load_san`.

use crate::engine::board::STARTING_FEN;
use crate::engine::game::GameEngine;

const LINE_WIDTH: usize = 80;
const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

// =========================================================================
// PGN generation
// =========================================================================

/// Export a game as a PGN string. The whole history is written whatever
/// the cursor position. The result is always `*`: game termination is not
/// tracked.
pub fn to_pgn(game: &GameEngine) -> String {
    let mut pgn = String::with_capacity(512);
    let result = "*";

    let date = game.created_at.format("%Y.%m.%d").to_string();
    push_tag(&mut pgn, "Event", "Casual Game");
    push_tag(&mut pgn, "Site", "chess-history");
    push_tag(&mut pgn, "Date", &date);
    push_tag(&mut pgn, "Round", "-");
    push_tag(&mut pgn, "White", &game.white_player);
    push_tag(&mut pgn, "Black", &game.black_player);
    push_tag(&mut pgn, "Result", result);

    let initial_fen = game.history().initial_position().to_fen();
    if initial_fen != STARTING_FEN {
        push_tag(&mut pgn, "SetUp", "1");
        push_tag(&mut pgn, "FEN", &initial_fen);
    }

    pgn.push('\n');

    let mut line = String::new();
    for (i, gm) in game.history().entries().iter().enumerate() {
        let token = if gm.is_white() {
            format!("{}. {}", gm.movenum(), gm.san())
        } else if i == 0 {
            format!("{}... {}", gm.movenum(), gm.san())
        } else {
            gm.san().to_string()
        };
        push_wrapped(&mut pgn, &mut line, &token);
    }
    push_wrapped(&mut pgn, &mut line, result);
    pgn.push_str(&line);
    pgn.push('\n');

    pgn
}

fn push_tag(pgn: &mut String, name: &str, value: &str) {
    let value = value.replace('\\', "\\\\").replace('"', "\\\"");
    pgn.push_str(&format!("[{name} \"{value}\"]\n"));
}

/// Append `token` to `line`, flushing `line` into `pgn` first when the token
/// would push it past the line width.
fn push_wrapped(pgn: &mut String, line: &mut String, token: &str) {
    if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
        pgn.push_str(line);
        pgn.push('\n');
        line.clear();
    }
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(token);
}

// =========================================================================
// Movetext import
// =========================================================================

/// Tag pairs of a PGN text, in order.
pub fn tags(pgn: &str) -> Vec<(String, String)> {
    pgn.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('[')?.strip_suffix(']'))
        .filter_map(|body| {
            let (name, rest) = body.split_once(' ')?;
            let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
            Some((name.to_string(), value.replace("\\\"", "\"").replace("\\\\", "\\")))
        })
        .collect()
}

/// Move tokens of a PGN text with tags, comments, variations, move
/// numbers, NAGs and the result removed.
pub fn movetext_tokens(pgn: &str) -> Vec<String> {
    let mut text = String::new();
    for line in pgn.lines() {
        let line = line.trim();
        if line.starts_with('[') || line.starts_with('%') {
            continue;
        }
        // Rest-of-line comment.
        let line = line.split(';').next().unwrap_or_default();
        text.push_str(line);
        text.push(' ');
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut brace = false;
    let mut paren = 0usize;
    for c in text.chars() {
        match c {
            '{' if !brace => brace = true,
            '}' if brace => brace = false,
            '(' if !brace => paren += 1,
            ')' if !brace && paren > 0 => paren -= 1,
            _ if brace || paren > 0 => {}
            _ => cleaned.push(c),
        }
    }

    cleaned
        .split_whitespace()
        .filter(|tok| !RESULTS.contains(tok) && !tok.starts_with('$'))
        .filter_map(|tok| {
            // "12.e4", "12...e5" and "4.0-0" carry the move after the number.
            let tok = match tok.find(|c: char| !c.is_ascii_digit()) {
                Some(i) if i > 0 && tok[i..].starts_with('.') => tok[i..].trim_start_matches('.'),
                Some(_) => tok,
                None => "",
            };
            (!tok.is_empty()).then(|| tok.to_string())
        })
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
