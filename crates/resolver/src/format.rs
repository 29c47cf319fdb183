//! printf-style format directives
//!
//! Grammar: `%[flags][width][.precision]conversion`, flags `-` `0` `+` space,
//! conversions `s S d o x X f e E b B`. `%%` is a literal percent sign.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use contracts::FieldValue;

/// Value class a directive expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Textual,
    Integer,
    Floating,
    Boolean,
}

/// Conversion character of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `%s`
    Str,
    /// `%d`
    Decimal,
    /// `%o`
    Octal,
    /// `%x`
    Hex,
    /// `%f`
    Fixed,
    /// `%e`
    Scientific,
    /// `%b`
    Bool,
}

impl Conversion {
    pub fn type_class(&self) -> TypeClass {
        match self {
            Self::Str => TypeClass::Textual,
            Self::Decimal | Self::Octal | Self::Hex => TypeClass::Integer,
            Self::Fixed | Self::Scientific => TypeClass::Floating,
            Self::Bool => TypeClass::Boolean,
        }
    }

    fn symbol(&self, uppercase: bool) -> char {
        let symbol = match self {
            Self::Str => 's',
            Self::Decimal => 'd',
            Self::Octal => 'o',
            Self::Hex => 'x',
            Self::Fixed => 'f',
            Self::Scientific => 'e',
            Self::Bool => 'b',
        };
        if uppercase {
            symbol.to_ascii_uppercase()
        } else {
            symbol
        }
    }
}

/// Directive flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// `-`
    pub left_align: bool,
    /// `0`
    pub zero_pad: bool,
    /// `+`
    pub plus: bool,
    /// space
    pub space: bool,
}

/// One parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub conversion: Conversion,
    pub uppercase: bool,
}

impl FormatSpec {
    pub fn type_class(&self) -> TypeClass {
        self.conversion.type_class()
    }

    /// Coerce `value` to the directive's type class and format it
    ///
    /// Returns `None` when the value has no view in that class.
    pub fn render(&self, value: &FieldValue) -> Option<String> {
        let (sign, body, numeric) = match self.conversion {
            Conversion::Str => (
                "",
                self.truncate(value.to_string()),
                false,
            ),
            Conversion::Bool => {
                // a present non-boolean argument renders "true"
                let truth = match value {
                    FieldValue::Bool(b) => *b,
                    _ => true,
                };
                ("", self.truncate(truth.to_string()), false)
            }
            Conversion::Decimal => {
                let v = value.as_integer()?;
                (self.sign(v < 0), v.unsigned_abs().to_string(), true)
            }
            Conversion::Octal => ("", format!("{:o}", twos_complement(value.as_integer()?)?), true),
            Conversion::Hex => ("", format!("{:x}", twos_complement(value.as_integer()?)?), true),
            Conversion::Fixed | Conversion::Scientific => {
                let v = value.as_float()?;
                let sign = self.sign(v.is_sign_negative() && !v.is_nan());
                let precision = self.precision.unwrap_or(6);
                if v.is_nan() {
                    ("", "NaN".to_string(), false)
                } else if v.is_infinite() {
                    (sign, "Infinity".to_string(), false)
                } else if self.conversion == Conversion::Fixed {
                    (sign, fixed_half_up(v.abs(), precision), true)
                } else {
                    (sign, scientific_half_up(v.abs(), precision), true)
                }
            }
        };

        let body = if self.uppercase {
            body.to_uppercase()
        } else {
            body
        };
        Some(self.pad(sign, &body, numeric))
    }

    fn truncate(&self, text: String) -> String {
        match self.precision {
            Some(precision) => text.chars().take(precision).collect(),
            None => text,
        }
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        }
    }

    fn pad(&self, sign: &str, body: &str, numeric: bool) -> String {
        let len = sign.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{sign}{body}");
        }
        let fill = width - len;
        if self.flags.left_align {
            format!("{sign}{body}{}", " ".repeat(fill))
        } else if self.flags.zero_pad && numeric {
            format!("{sign}{}{body}", "0".repeat(fill))
        } else {
            format!("{}{sign}{body}", " ".repeat(fill))
        }
    }

    fn check(&self) -> Result<(), &'static str> {
        let flags = self.flags;
        if (flags.left_align || flags.zero_pad) && self.width.is_none() {
            return Err("'-' and '0' flags require a width");
        }
        if flags.left_align && flags.zero_pad {
            return Err("'-' and '0' flags are mutually exclusive");
        }
        match self.type_class() {
            TypeClass::Textual | TypeClass::Boolean => {
                if flags.zero_pad || flags.plus || flags.space {
                    return Err("numeric flag on a non-numeric conversion");
                }
            }
            TypeClass::Integer => {
                if self.precision.is_some() {
                    return Err("precision is not allowed on integer conversions");
                }
                if self.conversion != Conversion::Decimal && (flags.plus || flags.space) {
                    return Err("sign flag requires a signed conversion");
                }
            }
            TypeClass::Floating => {}
        }
        Ok(())
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        if self.flags.left_align {
            f.write_str("-")?;
        }
        if self.flags.plus {
            f.write_str("+")?;
        }
        if self.flags.space {
            f.write_str(" ")?;
        }
        if self.flags.zero_pad {
            f.write_str("0")?;
        }
        if let Some(width) = self.width {
            write!(f, "{width}")?;
        }
        if let Some(precision) = self.precision {
            write!(f, ".{precision}")?;
        }
        write!(f, "{}", self.conversion.symbol(self.uppercase))
    }
}

/// Literal text or directive, in order of appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Directive(FormatSpec),
}

/// Split a template skeleton into literal and directive segments
pub(crate) fn parse_segments(skeleton: &str) -> Result<Vec<Segment>, &'static str> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = skeleton.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            literal.push('%');
            continue;
        }

        let spec = parse_directive(&mut chars)?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Directive(spec));
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn parse_directive(chars: &mut Peekable<Chars<'_>>) -> Result<FormatSpec, &'static str> {
    let mut flags = Flags::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => flags.left_align = true,
            '0' => flags.zero_pad = true,
            '+' => flags.plus = true,
            ' ' => flags.space = true,
            _ => break,
        }
        chars.next();
    }

    let width = take_number(chars)?;
    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        Some(take_number(chars)?.ok_or("missing precision after '.'")?)
    } else {
        None
    };

    let symbol = chars.next().ok_or("dangling '%' at end of template")?;
    let (conversion, uppercase) = match symbol {
        's' => (Conversion::Str, false),
        'S' => (Conversion::Str, true),
        'd' => (Conversion::Decimal, false),
        'o' => (Conversion::Octal, false),
        'x' => (Conversion::Hex, false),
        'X' => (Conversion::Hex, true),
        'f' => (Conversion::Fixed, false),
        'e' => (Conversion::Scientific, false),
        'E' => (Conversion::Scientific, true),
        'b' => (Conversion::Bool, false),
        'B' => (Conversion::Bool, true),
        _ => return Err("unsupported conversion"),
    };

    let spec = FormatSpec {
        flags,
        width,
        precision,
        conversion,
        uppercase,
    };
    spec.check()?;
    Ok(spec)
}

/// Upper bound for width and precision
pub(crate) const MAX_WIDTH: usize = 4096;

fn take_number(chars: &mut Peekable<Chars<'_>>) -> Result<Option<usize>, &'static str> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_WIDTH => Ok(Some(n)),
        _ => Err("width or precision exceeds 4096"),
    }
}

/// Negative integers print as their 64-bit two's complement in octal/hex
///
/// `None` outside `i64::MIN..=u64::MAX`.
fn twos_complement(v: i128) -> Option<u64> {
    if v < 0 {
        i64::try_from(v).ok().map(|v| v as u64)
    } else {
        u64::try_from(v).ok()
    }
}

/// Shortest round-trip decimal digits of `abs` and its base-10 exponent
///
/// `abs == d0.d1d2... * 10^exp`
fn decimal_digits(abs: f64) -> (Vec<u8>, i64) {
    let sci = format!("{abs:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    (digits, exp.parse().unwrap_or(0))
}

/// Keep `keep` digits, rounding half up; returns true when the carry added a leading digit
fn round_half_up(digits: &mut Vec<u8>, keep: usize) -> bool {
    if digits.len() <= keep {
        digits.resize(keep, 0);
        return false;
    }
    let round_up = digits[keep] >= 5;
    digits.truncate(keep);
    if !round_up {
        return false;
    }
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    digits.insert(0, 1);
    true
}

/// Fixed notation rounded half up on the decimal form (`12.345` -> `12.35`)
fn fixed_half_up(abs: f64, precision: usize) -> String {
    let (mut digits, exp) = decimal_digits(abs);

    let mut int_len = exp + 1;
    if int_len < 1 {
        let mut padded = vec![0; (1 - int_len) as usize];
        padded.append(&mut digits);
        digits = padded;
        int_len = 1;
    }
    let mut int_len = int_len as usize;
    if round_half_up(&mut digits, int_len + precision) {
        int_len += 1;
    }

    let mut out = String::with_capacity(digits.len() + 1);
    for (i, &d) in digits.iter().enumerate() {
        if i == int_len {
            out.push('.');
        }
        out.push(char::from(b'0' + d));
    }
    out
}

/// Scientific notation with a signed two-digit exponent (`1.234568e+04`)
fn scientific_half_up(abs: f64, precision: usize) -> String {
    let (mut digits, mut exp) = decimal_digits(abs);
    if abs == 0.0 {
        exp = 0;
    }
    if round_half_up(&mut digits, precision + 1) {
        exp += 1;
        digits.truncate(precision + 1);
    }

    let mut out = String::with_capacity(precision + 6);
    for (i, &d) in digits.iter().enumerate() {
        if i == 1 {
            out.push('.');
        }
        out.push(char::from(b'0' + d));
    }
    out.push('e');
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));
    out
}
