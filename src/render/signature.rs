//! Signature pretty-printing.
//!
//! Signatures that read as a plain call (`name(a, b=1, *args)`) are laid
//! out the way a code formatter would at 80 columns: on one line if it
//! fits, else with the arguments on one indented line, else one argument
//! per line with trailing commas. Anything that is not a valid call
//! expression (annotations, `->`, bare `*` or `/` separators) is emitted
//! on a single line as written.

use crate::model::{DefaultValue, Param, ParamKind, Signature};
use crate::parser::annotation::TypeContext;

const LINE_LENGTH: usize = 80;
const INDENT: &str = "    ";

pub fn format_signature(name: &str, sig: &Signature, ctx: &TypeContext<'_>) -> String {
    let call_like = is_call_like(sig);
    let params: Vec<String> = sig
        .params
        .iter()
        .map(|p| format_param(p, ctx, call_like))
        .collect();

    if !call_like {
        let mut text = format!("{}({})", name, params.join(", "));
        if let Some(ret) = &sig.returns {
            text.push_str(" -> ");
            text.push_str(&ctx.resolve(ret));
        }
        return text;
    }

    let flat = format!("{}({})", name, params.join(", "));
    if flat.chars().count() <= LINE_LENGTH {
        return flat;
    }
    let hanging = format!("{}{}", INDENT, params.join(", "));
    if hanging.chars().count() <= LINE_LENGTH {
        return format!("{}(\n{}\n)", name, hanging);
    }
    let mut lines = vec![format!("{}(", name)];
    lines.extend(params.iter().map(|p| format!("{}{},", INDENT, p)));
    lines.push(")".to_string());
    lines.join("\n")
}

fn is_call_like(sig: &Signature) -> bool {
    if sig.returns.is_some() {
        return false;
    }
    let mut seen_keyword = false;
    for p in &sig.params {
        if p.annotation.is_some() {
            return false;
        }
        match (p.kind, &p.default) {
            (ParamKind::PositionalOnlyMarker | ParamKind::KeywordOnlyMarker, _) => return false,
            (ParamKind::Positional | ParamKind::KeywordOnly, DefaultValue::Missing) if seen_keyword => {
                return false;
            }
            (ParamKind::Positional | ParamKind::KeywordOnly, DefaultValue::Missing) => {}
            (ParamKind::Positional | ParamKind::KeywordOnly, _) => seen_keyword = true,
            (ParamKind::VarPositional | ParamKind::VarKeyword, _) => {}
        }
    }
    true
}

fn format_param(p: &Param, ctx: &TypeContext<'_>, normalize: bool) -> String {
    let mut text = match p.kind {
        ParamKind::PositionalOnlyMarker => return "/".to_string(),
        ParamKind::KeywordOnlyMarker => return "*".to_string(),
        ParamKind::VarPositional => format!("*{}", p.name),
        ParamKind::VarKeyword => format!("**{}", p.name),
        ParamKind::Positional | ParamKind::KeywordOnly => p.name.clone(),
    };
    if let Some(ann) = &p.annotation {
        text.push_str(": ");
        text.push_str(&ctx.resolve(ann));
    }
    let default = match &p.default {
        DefaultValue::Missing => return text,
        DefaultValue::None => "None".to_string(),
        DefaultValue::Value(v) if normalize => prefer_double_quotes(v),
        DefaultValue::Value(v) => v.clone(),
    };
    if p.annotation.is_some() {
        format!("{} = {}", text, default)
    } else {
        format!("{}={}", text, default)
    }
}

/// `'abc'` becomes `"abc"` unless the body holds a quote or escape.
fn prefer_double_quotes(value: &str) -> String {
    match value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        Some(body) if !body.contains(['"', '\'', '\\']) => format!("\"{}\"", body),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Module;

    fn param(name: &str) -> Param {
        Param::new(name, ParamKind::Positional)
    }

    fn with_default(name: &str, default: &str) -> Param {
        Param {
            default: DefaultValue::from_source(default),
            ..param(name)
        }
    }

    #[test]
    fn short_call_is_one_line() {
        let m = Module::default();
        let sig = Signature {
            params: vec![param("a"), with_default("b", "'x'")],
            returns: None,
        };
        assert_eq!(format_signature("f", &sig, &TypeContext::new(&m)), "f(a, b=\"x\")");
    }

    #[test]
    fn long_call_wraps_arguments() {
        let m = Module::default();
        let params = (0..6).map(|i| param(&format!("argument_{}", i))).collect();
        let sig = Signature {
            params,
            returns: None,
        };
        let out = format_signature("function_name", &sig, &TypeContext::new(&m));
        assert!(out.starts_with("function_name(\n    argument_0, argument_1,"));
        assert!(out.ends_with("argument_5\n)"));
    }

    #[test]
    fn very_long_call_puts_one_argument_per_line() {
        let m = Module::default();
        let params = (0..12).map(|i| param(&format!("long_argument_{}", i))).collect();
        let sig = Signature {
            params,
            returns: None,
        };
        let out = format_signature("f", &sig, &TypeContext::new(&m));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 14);
        assert_eq!(lines[1], "    long_argument_0,");
        assert_eq!(lines[13], ")");
    }

    #[test]
    fn annotated_signature_stays_on_one_line() {
        let m = Module::default();
        let sig = Signature {
            params: vec![
                Param {
                    annotation: Some("int".into()),
                    default: DefaultValue::Value("3".into()),
                    ..param("x")
                },
                Param::new("", ParamKind::KeywordOnlyMarker),
                Param::new("flag", ParamKind::KeywordOnly),
            ],
            returns: Some("None".into()),
        };
        assert_eq!(
            format_signature("g", &sig, &TypeContext::new(&m)),
            "g(x: int = 3, *, flag) -> None"
        );
    }

    #[test]
    fn positional_after_keyword_is_not_reformatted() {
        let sig = Signature {
            params: vec![with_default("a", "1"), param("b")],
            returns: None,
        };
        assert!(!is_call_like(&sig));
    }
}
