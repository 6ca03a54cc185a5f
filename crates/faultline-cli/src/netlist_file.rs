//! # faultline-cli::netlist_file
//!
//! A small line-oriented netlist format, enough to drive the tool end to
//! end without a real HDL frontend:
//!
//! ```text
//! # comment
//! input  a
//! input  b
//! dff    q  g2        # name, data source (may be defined later)
//! gate   g1 nand a q
//! gate   g2 not  g1
//! output y  g1
//! ```
//!
//! Gates must be defined before they are referenced, except DFF data
//! sources, which are resolved after the whole file is read.

use anyhow::{anyhow, bail, Context, Result};
use faultline_net::{GateType, Netlist, NetlistBuilder};
use faultline_types::NodeId;
use std::collections::HashMap;
use std::path::Path;

pub fn load(path: &Path) -> Result<Netlist> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading netlist {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing netlist {}", path.display()))
}

pub fn parse(text: &str) -> Result<Netlist> {
    let mut builder = NetlistBuilder::new();
    let mut names: HashMap<String, NodeId> = HashMap::new();
    // (dff node, source name, line number)
    let mut pending_dffs: Vec<(NodeId, String, usize)> = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap();
        match keyword {
            "input" => {
                let name = expect_name(&mut tokens, lineno)?;
                let id = builder.add_input(&name);
                define(&mut names, name, id, lineno)?;
            }
            "dff" => {
                let name = expect_name(&mut tokens, lineno)?;
                let src = expect_name(&mut tokens, lineno)?;
                let id = builder.add_dff(&name);
                define(&mut names, name, id, lineno)?;
                pending_dffs.push((id, src, lineno));
            }
            "gate" => {
                let name = expect_name(&mut tokens, lineno)?;
                let kind = expect_name(&mut tokens, lineno)?;
                let gate = gate_type(&kind)
                    .ok_or_else(|| anyhow!("line {}: unknown gate type '{}'", lineno, kind))?;
                let fanins: Vec<NodeId> = tokens
                    .map(|t| resolve(&names, t, lineno))
                    .collect::<Result<_>>()?;
                let id = builder
                    .add_gate(&name, gate, &fanins)
                    .map_err(|e| anyhow!("line {}: {}", lineno, e))?;
                define(&mut names, name, id, lineno)?;
            }
            "output" => {
                let name = expect_name(&mut tokens, lineno)?;
                let src = expect_name(&mut tokens, lineno)?;
                let src_id = resolve(&names, &src, lineno)?;
                builder
                    .add_output(&name, src_id)
                    .map_err(|e| anyhow!("line {}: {}", lineno, e))?;
            }
            other => bail!("line {}: unknown keyword '{}'", lineno, other),
        }
    }

    for (dff, src, lineno) in pending_dffs {
        let src_id = resolve(&names, &src, lineno)?;
        builder
            .connect_dff(dff, src_id)
            .map_err(|e| anyhow!("line {}: {}", lineno, e))?;
    }

    Ok(builder.finish()?)
}

fn expect_name(tokens: &mut std::str::SplitWhitespace<'_>, lineno: usize) -> Result<String> {
    tokens
        .next()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("line {}: missing token", lineno))
}

fn define(
    names: &mut HashMap<String, NodeId>,
    name: String,
    id: NodeId,
    lineno: usize,
) -> Result<()> {
    if names.insert(name.clone(), id).is_some() {
        bail!("line {}: '{}' defined twice", lineno, name);
    }
    Ok(())
}

fn resolve(names: &HashMap<String, NodeId>, name: &str, lineno: usize) -> Result<NodeId> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| anyhow!("line {}: undefined signal '{}'", lineno, name))
}

fn gate_type(s: &str) -> Option<GateType> {
    Some(match s {
        "buf" => GateType::Buf,
        "not" => GateType::Not,
        "and" => GateType::And,
        "nand" => GateType::Nand,
        "or" => GateType::Or,
        "nor" => GateType::Nor,
        "xor" => GateType::Xor,
        "xnor" => GateType::Xnor,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_sequential_netlist() {
        let net = parse(
            r#"
            # toggle register with enable
            input  en
            dff    q  nq
            gate   nq xor en q
            output y  q
            "#,
        )
        .unwrap();
        assert_eq!(net.input_num(), 1);
        assert_eq!(net.dff_num(), 1);
        assert_eq!(net.output_num(), 1);
    }

    #[test]
    fn rejects_undefined_signals() {
        let err = parse("gate g and a b").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = parse("input a\ninput a\ngate g not a\noutput y g").unwrap_err();
        assert!(format!("{err:#}").contains("defined twice"));
    }
}
