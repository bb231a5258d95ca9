//! Token-level subject validation. Publish subjects must be fully
//! concrete; subscribe subjects may use the `*` and `>` wildcards.

use crate::error::{SubjectDirection, SubjectError};

fn tokens_ok(subject: &str) -> bool {
    if subject.is_empty() {
        return false;
    }
    if subject.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    subject.split('.').all(|tok| !tok.is_empty())
}

/// A subject with no wildcards, safe to hand to `PUB`/`HPUB`.
pub fn validate_publish(subject: &str) -> Result<(), SubjectError> {
    if !tokens_ok(subject) || subject.split('.').any(|tok| tok == "*" || tok == ">") {
        return Err(SubjectError {
            subject: subject.to_string(),
            direction: SubjectDirection::Publish,
        });
    }
    Ok(())
}

/// A subject pattern, possibly containing `*` (single-token wildcard) and
/// a trailing `>` (tail wildcard), safe to hand to `SUB`.
pub fn validate_subscribe(subject: &str) -> Result<(), SubjectError> {
    let err = || SubjectError {
        subject: subject.to_string(),
        direction: SubjectDirection::Subscribe,
    };
    if !tokens_ok(subject) {
        return Err(err());
    }
    let tokens: Vec<&str> = subject.split('.').collect();
    for (i, tok) in tokens.iter().enumerate() {
        match *tok {
            ">" if i != tokens.len() - 1 => return Err(err()),
            _ if tok.len() > 1 && (tok.contains('*') || tok.contains('>')) => return Err(err()),
            _ => {}
        }
    }
    Ok(())
}
