//! Start-up banner: "VK-INSIGHT" in the built-in figlet font, shaded top to bottom.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

const TITLE: &str = "VK-INSIGHT";

/// VK blue (#0077ff).
const TOP: (u8, u8, u8) = (0x00, 0x77, 0xff);
/// Pale sky (#9ad0ff).
const BOTTOM: (u8, u8, u8) = (0x9a, 0xd0, 0xff);

/// Linear blend; `t` in [0.0, 1.0].
fn blend(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (f64::from(x) * (1.0 - t) + f64::from(y) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Figlet rendering of the title, or the plain title when the font is unavailable.
fn art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(TITLE).map(|fig| fig.to_string()))
        .unwrap_or_else(|| TITLE.to_string())
}

pub fn print_welcome() {
    let mut out = stdout();
    let art = art();
    let lines: Vec<&str> = art.lines().collect();
    let last = lines.len().saturating_sub(1).max(1) as f64;

    // Terminal write failures are not worth aborting start-up for.
    for (i, line) in lines.iter().enumerate() {
        let (r, g, b) = blend(TOP, BOTTOM, i as f64 / last);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
    }
    let _ = out.execute(ResetColor);
    let _ = out.execute(Print(format!(
        "v{}  VK group posts, comments and engagement\r\n\r\n",
        env!("CARGO_PKG_VERSION")
    )));
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_hits_both_ends() {
        assert_eq!(blend(TOP, BOTTOM, 0.0), TOP);
        assert_eq!(blend(TOP, BOTTOM, 1.0), BOTTOM);
    }

    #[test]
    fn art_is_multiline() {
        assert!(art().lines().count() > 1);
    }
}
