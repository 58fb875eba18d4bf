//! Format-string interpreter
//!
//! Implements the `~`-directive mini-language used by `format`: `~a` and
//! `~s` render the next argument in princ/prin1 style, `~d`/`~x`/`~o`/`~b`
//! print integers in the matching radix, `~f`/`~e`/`~g` print floats, `~%`
//! and `~&` emit newlines, and `~~` escapes the tilde. Directives take
//! prefix parameters: decimal digits, `'c` for a literal character, `v` to
//! consume an argument, and `#` for the remaining argument count, separated
//! by commas.

use crate::error::{Error, Result};
use crate::runtime::node::PrintMode;
use crate::runtime::Node;

/// One parsed prefix parameter
#[derive(Clone, Copy)]
enum Param {
    Number(i64),
    Char(char),
}

impl Param {
    fn as_width(self) -> usize {
        match self {
            Param::Number(n) if n > 0 => n as usize,
            _ => 0,
        }
    }

    fn as_pad(self) -> char {
        match self {
            Param::Char(c) => c,
            _ => ' ',
        }
    }
}

/// Interprets `spec` against `args`, appending the rendering to `out`.
pub fn format_into(out: &mut String, spec: &str, args: &[Node]) -> Result<()> {
    let mut args = args.iter();
    let mut remaining = args.len();
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        let mut params = Vec::new();
        loop {
            match chars.peek() {
                Some('0'..='9') => {
                    let mut n = 0i64;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        n = n * 10 + d as i64;
                        chars.next();
                    }
                    params.push(Param::Number(n));
                }
                Some('\'') => {
                    chars.next();
                    let c = chars.next().ok_or(Error::UnexpectedEof)?;
                    params.push(Param::Char(c));
                }
                Some('v') | Some('V') => {
                    chars.next();
                    let arg = next_arg(&mut args, &mut remaining)?;
                    params.push(Param::Number(arg.as_int()?));
                }
                Some('#') => {
                    chars.next();
                    params.push(Param::Number(remaining as i64));
                }
                _ => {}
            }
            if chars.peek() == Some(&',') {
                chars.next();
                continue;
            }
            break;
        }
        let directive = chars.next().ok_or(Error::UnexpectedEof)?;
        apply_directive(out, directive, &params, &mut args, &mut remaining)?;
    }
    Ok(())
}

fn next_arg<'a>(
    args: &mut std::slice::Iter<'a, Node>,
    remaining: &mut usize,
) -> Result<&'a Node> {
    let arg = args.next().ok_or(Error::TooFewArguments)?;
    *remaining -= 1;
    Ok(arg)
}

fn apply_directive(
    out: &mut String,
    directive: char,
    params: &[Param],
    args: &mut std::slice::Iter<Node>,
    remaining: &mut usize,
) -> Result<()> {
    match directive.to_ascii_lowercase() {
        'a' => pad_to_width(out, params, next_arg(args, remaining)?.to_princ_string()),
        's' => pad_to_width(out, params, next_arg(args, remaining)?.to_prin1_string()),
        'd' => print_radix(out, params, next_arg(args, remaining)?, 10)?,
        'x' => print_radix(out, params, next_arg(args, remaining)?, 16)?,
        'o' => print_radix(out, params, next_arg(args, remaining)?, 8)?,
        'b' => print_radix(out, params, next_arg(args, remaining)?, 2)?,
        'f' => print_float(out, params, next_arg(args, remaining)?, FloatStyle::Fixed)?,
        'e' => print_float(out, params, next_arg(args, remaining)?, FloatStyle::Exponent)?,
        'g' => print_float(out, params, next_arg(args, remaining)?, FloatStyle::General)?,
        '%' | '&' => {
            let count = params.first().map_or(1, |p| p.as_width());
            for _ in 0..count {
                out.push('\n');
            }
        }
        '~' => out.push('~'),
        other => return Err(Error::UnknownDirective(other)),
    }
    Ok(())
}

/// `~a`/`~s`: left-justified, space-padded to the minimum field width.
fn pad_to_width(out: &mut String, params: &[Param], text: String) {
    let width = params.first().map_or(0, |p| p.as_width());
    out.push_str(&text);
    for _ in text.chars().count()..width {
        out.push(' ');
    }
}

/// Integer directives: right-justified in the field width, padded with the
/// second parameter (default space). Hex digits print uppercase. Floats are
/// truncated toward zero; negative values print as a signed magnitude in
/// every radix.
fn print_radix(out: &mut String, params: &[Param], arg: &Node, radix: u32) -> Result<()> {
    let value = match arg {
        Node::Float(f) => *f as i64,
        other => other.as_int()?,
    };
    let magnitude = value.unsigned_abs();
    let body = match radix {
        16 => format!("{:X}", magnitude),
        8 => format!("{:o}", magnitude),
        2 => format!("{:b}", magnitude),
        _ => magnitude.to_string(),
    };
    let digits = if value < 0 {
        format!("-{body}")
    } else {
        body
    };
    let width = params.first().map_or(0, |p| p.as_width());
    let pad = params.get(1).map_or(' ', |p| p.as_pad());
    for _ in digits.chars().count()..width {
        out.push(pad);
    }
    out.push_str(&digits);
    Ok(())
}

#[derive(Clone, Copy)]
enum FloatStyle {
    Fixed,
    Exponent,
    General,
}

fn print_float(out: &mut String, params: &[Param], arg: &Node, style: FloatStyle) -> Result<()> {
    let value = arg.as_f64()?;
    let width = params.first().map_or(0, |p| p.as_width());
    let precision = params.get(1).and_then(|p| match p {
        Param::Number(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    });
    let text = match (style, precision) {
        (FloatStyle::Fixed, Some(p)) => format!("{value:.p$}"),
        (FloatStyle::Fixed, None) => format!("{value:.6}"),
        (FloatStyle::Exponent, Some(p)) => format!("{value:.p$e}"),
        (FloatStyle::Exponent, None) => format!("{value:e}"),
        (FloatStyle::General, _) => {
            let mut s = String::new();
            crate::runtime::Node::Float(value).print_to(&mut s, PrintMode::Princ);
            s
        }
    };
    for _ in text.chars().count()..width {
        out.push(' ');
    }
    out.push_str(&text);
    Ok(())
}
