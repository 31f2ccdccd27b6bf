//! Derives a node's pins from the signature of its `@node_entry`-decorated
//! function, without parsing the function body.
//!
//! This is deliberately not a full Python parser: the node source is
//! user-authored *data*, and the engine only ever needs the decorator line,
//! the `def` line (which may wrap across several physical lines), and an
//! optional `@outputs:` docstring directive.

/// One parameter or output pin derived from the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPin {
    pub name: String,
    pub type_name: String,
}

/// Everything derivable from a node's source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignature {
    pub function_name: String,
    pub inputs: Vec<ParsedPin>,
    pub outputs: Vec<ParsedPin>,
    pub has_exec_in: bool,
}

/// Locate the first top-level `@node_entry`-decorated function and derive
/// its pins. Returns `None` if no such function exists.
pub fn derive_signature(source: &str) -> Option<ParsedSignature> {
    let lines: Vec<&str> = source.lines().collect();
    let decorator_line = lines
        .iter()
        .position(|l| l.trim_start().starts_with('@') && l.trim_start()[1..].trim_start().starts_with("node_entry"))?;

    let def_start = lines[decorator_line + 1..]
        .iter()
        .position(|l| l.trim_start().starts_with("def "))
        .map(|i| i + decorator_line + 1)?;

    // Join lines from `def` until we find the colon that closes the
    // signature at paren-depth zero (handles multi-line signatures).
    let mut signature_text = String::new();
    let mut depth: i32 = 0;
    let mut closed = false;
    for line in &lines[def_start..] {
        signature_text.push_str(line);
        signature_text.push(' ');
        for ch in line.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ':' if depth == 0 => closed = true,
                _ => {}
            }
        }
        if closed {
            break;
        }
    }

    let function_name = extract_between(&signature_text, "def ", "(")?.trim().to_string();
    let params_text = extract_balanced_parens(&signature_text)?;
    let return_annotation = extract_return_annotation(&signature_text);

    let params = split_top_level(&params_text, ',')
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && p != "self")
        .map(parse_param)
        .collect::<Vec<_>>();

    let has_exec_in = !params.is_empty();

    let output_names = docstring_outputs(&lines[def_start..]);
    let outputs = derive_outputs(return_annotation.as_deref(), &output_names);

    Some(ParsedSignature {
        function_name,
        inputs: params,
        outputs,
        has_exec_in,
    })
}

fn extract_between(text: &str, start: &str, end: &str) -> Option<String> {
    let start_idx = text.find(start)? + start.len();
    let end_idx = text[start_idx..].find(end)? + start_idx;
    Some(text[start_idx..end_idx].to_string())
}

/// Extract the text strictly inside the signature's outer `(...)`.
fn extract_balanced_parens(text: &str) -> Option<String> {
    let open = text.find('(')?;
    let mut depth = 0i32;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[open + 1..open + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the text between the signature's closing `)` and its closing
/// `:`, stripping a leading `->` if present.
fn extract_return_annotation(text: &str) -> Option<String> {
    let open = text.find('(')?;
    let mut depth = 0i32;
    let mut close_paren = None;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close_paren = Some(open + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let close_paren = close_paren?;
    let rest = &text[close_paren..];
    let colon = rest.find(':')?;
    let annotation = rest[..colon].trim();
    let annotation = annotation.strip_prefix("->").unwrap_or(annotation).trim();
    if annotation.is_empty() {
        None
    } else {
        Some(annotation.to_string())
    }
}

/// Split on `sep` only at bracket/paren depth zero.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_param(param: String) -> ParsedPin {
    // Drop a default value first: `x: int = 5` -> `x: int`.
    let without_default = param.split('=').next().unwrap_or(&param).trim();
    match without_default.split_once(':') {
        Some((name, annotation)) => {
            let annotation = annotation.trim();
            let type_name = if annotation == "None" || annotation.is_empty() {
                "any".to_string()
            } else {
                annotation.to_ascii_lowercase()
            };
            ParsedPin {
                name: name.trim().to_string(),
                type_name,
            }
        }
        None => ParsedPin {
            name: without_default.to_string(),
            type_name: "any".to_string(),
        },
    }
}

/// Look for an `@outputs: n1, n2, ...` line inside the docstring that
/// immediately follows the `def` line.
fn docstring_outputs(lines: &[&str]) -> Vec<String> {
    for line in lines.iter().take(12) {
        if let Some(idx) = line.find("@outputs:") {
            let rest = &line[idx + "@outputs:".len()..];
            return rest
                .trim()
                .trim_end_matches("\"\"\"")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
    Vec::new()
}

fn derive_outputs(return_annotation: Option<&str>, declared_names: &[String]) -> Vec<ParsedPin> {
    let Some(annotation) = return_annotation else {
        return Vec::new();
    };

    let lower = annotation.to_ascii_lowercase();
    if let Some(inner) = lower
        .strip_prefix("tuple[")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let types = split_top_level(inner, ',');
        return types
            .into_iter()
            .enumerate()
            .map(|(i, t)| ParsedPin {
                name: declared_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("output_{}", i + 1)),
                type_name: t.trim().to_string(),
            })
            .collect();
    }

    vec![ParsedPin {
        name: declared_names.first().cloned().unwrap_or_else(|| "output_1".to_string()),
        type_name: lower,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_function_derives_pins() {
        let src = "@node_entry\ndef f(x: int, y: str) -> Tuple[bool, int]:\n    return True, 1\n";
        let parsed = derive_signature(src).unwrap();
        assert_eq!(parsed.function_name, "f");
        assert!(parsed.has_exec_in);
        assert_eq!(parsed.inputs, vec![
            ParsedPin { name: "x".into(), type_name: "int".into() },
            ParsedPin { name: "y".into(), type_name: "str".into() },
        ]);
        assert_eq!(parsed.outputs, vec![
            ParsedPin { name: "output_1".into(), type_name: "bool".into() },
            ParsedPin { name: "output_2".into(), type_name: "int".into() },
        ]);
    }

    #[test]
    fn no_parameters_has_no_exec_in() {
        let src = "@node_entry\ndef start() -> str:\n    return \"hello\"\n";
        let parsed = derive_signature(src).unwrap();
        assert!(!parsed.has_exec_in);
        assert!(parsed.inputs.is_empty());
    }

    #[test]
    fn none_annotation_becomes_any() {
        let src = "@node_entry\ndef f(x: None) -> int:\n    return 1\n";
        let parsed = derive_signature(src).unwrap();
        assert_eq!(parsed.inputs[0].type_name, "any");
    }

    #[test]
    fn docstring_directive_names_outputs() {
        let src = "@node_entry\ndef f(x: int) -> Tuple[int, int]:\n    \"\"\"@outputs: quotient, remainder\"\"\"\n    return x // 2, x % 2\n";
        let parsed = derive_signature(src).unwrap();
        assert_eq!(parsed.outputs[0].name, "quotient");
        assert_eq!(parsed.outputs[1].name, "remainder");
    }

    #[test]
    fn no_return_annotation_yields_no_output_pins() {
        let src = "@node_entry\ndef f(x: int):\n    print(x)\n";
        let parsed = derive_signature(src).unwrap();
        assert!(parsed.outputs.is_empty());
    }

    #[test]
    fn missing_node_entry_returns_none() {
        let src = "def f(x: int) -> int:\n    return x\n";
        assert!(derive_signature(src).is_none());
    }

    #[test]
    fn nested_generic_types_preserved_verbatim() {
        let src = "@node_entry\ndef f(items: List[Dict[str, int]]) -> List[Dict[str, int]]:\n    return items\n";
        let parsed = derive_signature(src).unwrap();
        assert_eq!(parsed.inputs[0].type_name, "list[dict[str, int]]");
        assert_eq!(parsed.outputs[0].type_name, "list[dict[str, int]]");
    }

    #[test]
    fn multiline_signature_is_joined() {
        let src = "@node_entry\ndef f(\n    x: int,\n    y: int,\n) -> int:\n    return x + y\n";
        let parsed = derive_signature(src).unwrap();
        assert_eq!(parsed.inputs.len(), 2);
    }
}
