//! WCNF/PWCNF/OPB readers and a PWCNF writer. Readers share the usual DIMACS
//! shape: a stream of whitespace-separated tokens, `c`-comment lines
//! skipped, a single `p` header parsed up front.
use std::io::{self, BufRead, Write};

use crate::error::{MaxSatError, Result};
use crate::types::*;

use super::{Formula, HardClause, PbConstraint, PbOp, SoftClause};

const DEFAULT_HARD_WEIGHT: Weight = u64::MAX;

/// Which input dialect a file was parsed as; threaded through so the writer
/// can round-trip the same shape it read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Wcnf,
    Pwcnf,
    Opb,
}

struct LineNo(usize);

fn malformed(line: &LineNo, reason: impl Into<String>) -> MaxSatError {
    MaxSatError::Malformed {
        line: line.0,
        reason: reason.into(),
    }
}

/// Parses a WCNF, PWCNF, or OPB file from `reader`, dispatching on the `p`
/// header's format token (only OPB lacks a `p` line, detected by its leading
/// `*`/`min:` syntax instead).
pub fn read(reader: impl BufRead) -> Result<(Formula, InputFormat)> {
    let mut lines = reader.lines();
    let mut lineno = 0usize;
    let mut first_content: Option<String> = None;
    while let Some(line) = lines.next() {
        lineno += 1;
        let line = line.map_err(|e| MaxSatError::Internal(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('c') {
            continue;
        }
        first_content = Some(line);
        break;
    }
    let first = match first_content {
        Some(l) => l,
        None => return Err(malformed(&LineNo(lineno), "empty input")),
    };

    if first.trim_start().starts_with('*') || looks_like_opb(&first) {
        return read_opb_body(first, lines, lineno).map(|f| (f, InputFormat::Opb));
    }

    let header = first.trim();
    if !header.starts_with('p') {
        return Err(malformed(&LineNo(lineno), "expected a `p` header line"));
    }
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(malformed(&LineNo(lineno), "`p` header has too few fields"));
    }
    match fields[1] {
        "wcnf" => read_wcnf_body(&fields, &LineNo(lineno), lines),
        "pwcnf" => read_pwcnf_body(&fields, &LineNo(lineno), lines),
        "cnf" => read_cnf_body(&fields, &LineNo(lineno), lines),
        other => Err(malformed(&LineNo(lineno), format!("unknown format `{other}`"))),
    }
    .map(|f| {
        let fmt = if fields[1] == "pwcnf" {
            InputFormat::Pwcnf
        } else {
            InputFormat::Wcnf
        };
        (f, fmt)
    })
}

fn looks_like_opb(line: &str) -> bool {
    line.trim_start().starts_with("min:") || line.trim_start().starts_with("max:")
}

fn parse_clause_tail(tokens: &[&str], line: &LineNo) -> Result<Vec<Lit>> {
    let mut lits = Vec::with_capacity(tokens.len());
    for &t in tokens {
        let x: i32 = t
            .parse()
            .map_err(|_| malformed(line, format!("not an integer literal: `{t}`")))?;
        if x == 0 {
            break;
        }
        lits.push(int2lit(x));
    }
    Ok(lits)
}

fn read_cnf_body(
    fields: &[&str],
    header_line: &LineNo,
    lines: io::Lines<impl BufRead>,
) -> Result<Formula> {
    let num_vars: usize = fields[2]
        .parse()
        .map_err(|_| malformed(header_line, "bad nbvar field"))?;
    let mut f = Formula::new(num_vars, 1);
    let mut lineno = header_line.0;
    for line in lines {
        lineno += 1;
        let line = line.map_err(|e| MaxSatError::Internal(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        let toks: Vec<&str> = trimmed.split_whitespace().collect();
        let lits = parse_clause_tail(&toks, &LineNo(lineno))?;
        f.hard.push(HardClause {
            lits,
            partition_id: None,
        });
    }
    Ok(f)
}

/// `p wcnf <nvars> <nclauses> [<top>]`, each clause line `<weight> l1 l2 ... 0`.
/// A weight equal to `top` (or absent top: unweighted) denotes a hard clause.
fn read_wcnf_body(
    fields: &[&str],
    header_line: &LineNo,
    lines: io::Lines<impl BufRead>,
) -> Result<Formula> {
    let num_vars: usize = fields[2]
        .parse()
        .map_err(|_| malformed(header_line, "bad nbvar field"))?;
    let top: Weight = match fields.get(4) {
        Some(s) => s.parse().map_err(|_| malformed(header_line, "bad top field"))?,
        None => DEFAULT_HARD_WEIGHT,
    };
    let mut f = Formula::new(num_vars, top);
    let mut lineno = header_line.0;
    for line in lines {
        lineno += 1;
        let line = line.map_err(|e| MaxSatError::Internal(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        let toks: Vec<&str> = trimmed.split_whitespace().collect();
        if toks.is_empty() {
            continue;
        }
        let ln = LineNo(lineno);
        let w: Weight = toks[0].parse().map_err(|_| malformed(&ln, "bad clause weight"))?;
        let lits = parse_clause_tail(&toks[1..], &ln)?;
        if w >= top {
            f.hard.push(HardClause {
                lits,
                partition_id: None,
            });
        } else {
            f.soft.push(SoftClause::new(lits, w, None));
        }
    }
    Ok(f)
}

/// `p pwcnf <nvars> <nclauses> <top> <nparts>`, each clause line
/// `<partition> <weight> l1 l2 ... 0`. Partition `0` and negative partitions
/// are both treated as "unpartitioned" at parse time and bucketed into the
/// single overflow partition by the engine/writer.
fn read_pwcnf_body(
    fields: &[&str],
    header_line: &LineNo,
    lines: io::Lines<impl BufRead>,
) -> Result<Formula> {
    let num_vars: usize = fields[2]
        .parse()
        .map_err(|_| malformed(header_line, "bad nbvar field"))?;
    let top: Weight = fields
        .get(4)
        .ok_or_else(|| malformed(header_line, "pwcnf header missing top weight"))?
        .parse()
        .map_err(|_| malformed(header_line, "bad top field"))?;
    let declared_parts: usize = fields
        .get(5)
        .map(|s| s.parse().unwrap_or(0))
        .unwrap_or(0);
    let mut f = Formula::new(num_vars, top);
    let mut max_part = 0usize;
    let mut lineno = header_line.0;
    for line in lines {
        lineno += 1;
        let line = line.map_err(|e| MaxSatError::Internal(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        let toks: Vec<&str> = trimmed.split_whitespace().collect();
        if toks.is_empty() {
            continue;
        }
        let ln = LineNo(lineno);
        let p: i64 = toks[0].parse().map_err(|_| malformed(&ln, "bad partition id"))?;
        let w: Weight = toks[1].parse().map_err(|_| malformed(&ln, "bad clause weight"))?;
        let lits = parse_clause_tail(&toks[2..], &ln)?;
        let partition_id = if p > 0 {
            max_part = max_part.max(p as usize);
            Some(p as usize - 1)
        } else {
            None
        };
        if w >= top {
            f.hard.push(HardClause { lits, partition_id });
        } else {
            f.soft.push(SoftClause::new(lits, w, partition_id));
        }
    }
    f.n_partitions = declared_parts.max(max_part);
    Ok(f)
}

/// Minimal linear pseudo-Boolean parser: `min:`/`max:` objective line of
/// `+w x1 +w x2 ...;`, then `>=`/`<=`/`=` constraint lines, all hard.
/// Variables are `x<k>` tokens; the objective's terms become unit soft
/// clauses forcing the complement of each positively-weighted literal.
fn read_opb_body(
    first: String,
    lines: io::Lines<impl BufRead>,
    start_lineno: usize,
) -> Result<Formula> {
    let mut lineno = start_lineno;
    let mut var_of: std::collections::HashMap<String, VarId> = std::collections::HashMap::new();
    let mut next_var: VarId = 1;
    let mut lookup = |name: &str, var_of: &mut std::collections::HashMap<String, VarId>| -> VarId {
        *var_of.entry(name.to_string()).or_insert_with(|| {
            let v = next_var;
            next_var += 1;
            v
        })
    };

    let mut f = Formula::new(0, DEFAULT_HARD_WEIGHT);
    parse_opb_line(&first, &LineNo(lineno), &mut f, &mut var_of, &mut lookup)?;
    for line in lines {
        lineno += 1;
        let line = line.map_err(|e| MaxSatError::Internal(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }
        parse_opb_line(trimmed, &LineNo(lineno), &mut f, &mut var_of, &mut lookup)?;
    }
    f.num_vars = next_var.saturating_sub(1);
    Ok(f)
}

fn parse_opb_line(
    line: &str,
    ln: &LineNo,
    f: &mut Formula,
    var_of: &mut std::collections::HashMap<String, VarId>,
    lookup: &mut impl FnMut(&str, &mut std::collections::HashMap<String, VarId>) -> VarId,
) -> Result<()> {
    let body = line.trim_end_matches(';').trim();
    if let Some(rest) = body.strip_prefix("min:").or_else(|| body.strip_prefix("max:")) {
        let negate = body.starts_with("max:");
        for (w, name, neg) in parse_pb_terms(rest, ln)? {
            let v = lookup(&name, var_of);
            let lit = if neg { v.neg_lit() } else { v.pos_lit() };
            // minimize sum w*lit == maximize satisfaction of `not lit` as a
            // soft clause with weight w (flip sense for `max:`).
            let soft_lit = if negate { lit } else { lit.negate() };
            f.soft.push(SoftClause::new(vec![soft_lit], w.max(1), None));
        }
        return Ok(());
    }
    for op in ["<=", ">=", "="] {
        if let Some(pos) = body.find(op) {
            let (lhs, rhs) = body.split_at(pos);
            let rhs = &rhs[op.len()..];
            let bound: i64 = rhs
                .trim()
                .parse()
                .map_err(|_| malformed(ln, "bad constraint bound"))?;
            let terms = parse_pb_terms(lhs, ln)?;
            encode_linear_constraint(f, &terms, op, bound, var_of, lookup);
            return Ok(());
        }
    }
    Err(malformed(ln, "unrecognized OPB line"))
}

fn parse_pb_terms(s: &str, ln: &LineNo) -> Result<Vec<(i64, String, bool)>> {
    let mut out = Vec::new();
    for tok_pair in s.split_whitespace().collect::<Vec<_>>().chunks(2) {
        if tok_pair.len() != 2 {
            return Err(malformed(ln, "dangling coefficient with no variable"));
        }
        let coeff: i64 = tok_pair[0]
            .trim_start_matches('+')
            .parse()
            .map_err(|_| malformed(ln, format!("bad coefficient `{}`", tok_pair[0])))?;
        let mut name = tok_pair[1].to_string();
        let neg = name.starts_with('~');
        if neg {
            name.remove(0);
        }
        out.push((coeff, name, neg));
    }
    Ok(out)
}

/// Stores every constraint as a [`PbConstraint`] (checked against the
/// incumbent, never asserted in the oracle — general PB-to-CNF encoding is
/// out of scope), and additionally asserts a hard clause for the common
/// "at-least-one"/"at-most-one over {0,1} vars" shape (a single
/// positive-unit-coefficient `>=` constraint), which lets the oracle prune
/// on it directly instead of only catching violations at the end.
fn encode_linear_constraint(
    f: &mut Formula,
    terms: &[(i64, String, bool)],
    op: &str,
    bound: i64,
    var_of: &mut std::collections::HashMap<String, VarId>,
    lookup: &mut impl FnMut(&str, &mut std::collections::HashMap<String, VarId>) -> VarId,
) {
    let lits: Vec<(i64, Lit)> = terms
        .iter()
        .map(|(c, name, neg)| {
            let v = lookup(name, var_of);
            let l = if *neg { v.neg_lit() } else { v.pos_lit() };
            (*c, l)
        })
        .collect();

    let pb_op = match op {
        "<=" => PbOp::Le,
        ">=" => PbOp::Ge,
        _ => PbOp::Eq,
    };
    f.pb_constraints.push(PbConstraint {
        terms: lits.clone(),
        op: pb_op,
        bound,
    });

    if op == ">=" && bound == 1 && lits.iter().all(|&(c, _)| c == 1) {
        let clause_lits: Vec<Lit> = lits.iter().map(|&(_, l)| l).collect();
        f.hard.push(HardClause {
            lits: clause_lits,
            partition_id: None,
        });
    }
}

/// Writes `formula` in PWCNF shape (or plain WCNF when `as_wcnf` is set),
/// bucketing clauses without a user partition into a single trailing
/// overflow partition appended past `n_partitions`.
pub fn write_pwcnf(formula: &Formula, mut w: impl Write, as_wcnf: bool) -> io::Result<()> {
    let overflow = formula.overflow_partition();
    let nb_part = if formula
        .hard
        .iter()
        .any(|c| c.partition_id.is_none())
        || formula.soft.iter().any(|c| c.partition_id.is_none())
    {
        overflow + 1
    } else {
        formula.n_partitions
    };

    let mut body = Vec::new();
    for c in &formula.hard {
        let p = c.partition_id.unwrap_or(overflow) + 1;
        if as_wcnf {
            write!(body, "{} ", formula.hard_weight)?;
        } else {
            write!(body, "{} {} ", p, formula.hard_weight)?;
        }
        write_clause(&mut body, &c.lits)?;
    }
    for c in &formula.soft {
        let p = c.partition_id.unwrap_or(overflow) + 1;
        if as_wcnf {
            write!(body, "{} ", c.weight)?;
        } else {
            write!(body, "{} {} ", p, c.weight)?;
        }
        write_clause(&mut body, &c.lits)?;
    }

    let total_clauses = formula.hard.len() + formula.soft.len();
    if as_wcnf {
        writeln!(
            w,
            "p wcnf {} {} {}",
            formula.num_vars, total_clauses, formula.hard_weight
        )?;
    } else {
        writeln!(
            w,
            "p pwcnf {} {} {} {}",
            formula.num_vars, total_clauses, formula.hard_weight, nb_part
        )?;
    }
    w.write_all(&body)
}

fn write_clause(w: &mut impl Write, lits: &[Lit]) -> io::Result<()> {
    for &l in lits {
        write!(w, "{} ", l.int())?;
    }
    writeln!(w, "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_wcnf_splitting_hard_and_soft() {
        let data = "c comment\np wcnf 2 3 10\n10 1 2 0\n3 1 0\n2 -2 0\n";
        let (f, fmt) = read(Cursor::new(data)).unwrap();
        assert_eq!(fmt, InputFormat::Wcnf);
        assert_eq!(f.hard.len(), 1);
        assert_eq!(f.soft.len(), 2);
        assert_eq!(f.hard_weight, 10);
    }

    #[test]
    fn reads_pwcnf_partitions_and_overflow_bucket() {
        let data = "p pwcnf 3 3 10 2\n1 10 1 2 0\n2 3 -1 0\n0 2 3 0\n";
        let (f, fmt) = read(Cursor::new(data)).unwrap();
        assert_eq!(fmt, InputFormat::Pwcnf);
        assert_eq!(f.hard.len(), 1);
        assert_eq!(f.hard[0].partition_id, Some(0));
        assert_eq!(f.soft.len(), 2);
        assert_eq!(f.soft[0].partition_id, Some(1));
        assert_eq!(f.soft[1].partition_id, None); // partition 0 -> overflow
    }

    #[test]
    fn round_trips_through_writer() {
        let data = "p pwcnf 2 2 10 1\n1 10 1 2 0\n1 3 -1 0\n";
        let (f, _) = read(Cursor::new(data)).unwrap();
        let mut out = Vec::new();
        write_pwcnf(&f, &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("p pwcnf 2 2 10 1\n"));
        assert!(text.contains("1 10 1 2 0\n"));
    }

    #[test]
    fn opb_le_constraint_is_stored_not_dropped() {
        // `<=` isn't the cheap at-least-one clause shape, so it must survive
        // as a stored PbConstraint rather than being silently discarded.
        let data = "min: +1 x1 +1 x2;\n+1 x1 +1 x2 <= 1;\n";
        let (f, fmt) = read(Cursor::new(data)).unwrap();
        assert_eq!(fmt, InputFormat::Opb);
        assert_eq!(f.hard.len(), 0, "<=1 has no cheap clause encoding");
        assert_eq!(f.pb_constraints.len(), 1);
        assert!(f.pb_constraints[0].satisfied_by(&[true, false]));
        assert!(!f.pb_constraints[0].satisfied_by(&[true, true]));
    }

    #[test]
    fn malformed_header_reports_line() {
        let data = "p wcnf not-a-number 1 10\n";
        let err = read(Cursor::new(data)).unwrap_err();
        match err {
            MaxSatError::Malformed { line, .. } => assert_eq!(line, 1),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
