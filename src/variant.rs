//! Genotype calls and variant classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;
use crate::offset::{Length, Position};

/// One of the two haplotype copies tracked per genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlleleType {
    Paternal,
    Maternal,
}

impl AlleleType {
    pub const BOTH: [AlleleType; 2] = [AlleleType::Paternal, AlleleType::Maternal];
}

impl fmt::Display for AlleleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlleleType::Paternal => write!(f, "paternal"),
            AlleleType::Maternal => write!(f, "maternal"),
        }
    }
}

impl FromStr for AlleleType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paternal" | "a" => Ok(AlleleType::Paternal),
            "maternal" | "b" => Ok(AlleleType::Maternal),
            _ => Err(SyncError::NoAllele(s.to_string())),
        }
    }
}

/// The kinds of variation a genome is known to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantType {
    Insertion,
    Deletion,
    Snp,
}

/// The outcome of classifying one allele of one genotype call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Bases inserted after the position (always positive).
    Insertion(Length),
    /// Bases removed after the position (always negative).
    Deletion(Length),
    Snp,
    Reference,
    NoCall,
}

impl VariantKind {
    /// Classify a signed length.
    pub fn from_length(length: Length) -> Self {
        match length {
            l if l > 0 => VariantKind::Insertion(l),
            l if l < 0 => VariantKind::Deletion(l),
            _ => VariantKind::Snp,
        }
    }

    pub fn variant_type(&self) -> Option<VariantType> {
        match self {
            VariantKind::Insertion(_) => Some(VariantType::Insertion),
            VariantKind::Deletion(_) => Some(VariantType::Deletion),
            VariantKind::Snp => Some(VariantType::Snp),
            VariantKind::Reference | VariantKind::NoCall => None,
        }
    }
}

/// A single allele symbol of a genotype call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleCall {
    NoCall,
    Reference,
    /// 1-based index into the comma-separated ALT field.
    Alternative(usize),
}

impl AlleleCall {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(AlleleCall::NoCall),
            '0' => Some(AlleleCall::Reference),
            c => c
                .to_digit(10)
                .map(|index| AlleleCall::Alternative(index as usize)),
        }
    }
}

/// A diploid genotype call, `a/b` (unphased) or `a|b` (phased).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genotype {
    pub paternal: AlleleCall,
    pub maternal: AlleleCall,
    pub phased: bool,
}

impl Genotype {
    /// Parse a genotype field. Anything that is not exactly three symbols
    /// (`allele separator allele`) is rejected.
    pub fn parse(field: &str) -> Option<Self> {
        let symbols: Vec<char> = field.chars().collect();
        if symbols.len() != 3 {
            return None;
        }
        let phased = match symbols[1] {
            '|' => true,
            '/' => false,
            _ => return None,
        };
        Some(Genotype {
            paternal: AlleleCall::from_symbol(symbols[0])?,
            maternal: AlleleCall::from_symbol(symbols[2])?,
            phased,
        })
    }

    pub fn call(&self, allele: AlleleType) -> AlleleCall {
        match allele {
            AlleleType::Paternal => self.paternal,
            AlleleType::Maternal => self.maternal,
        }
    }
}

/// Why a call could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    SvLen,
    AltIndex(usize),
}

/// Return the `index`-th (1-based) alternate of a comma-separated ALT field.
pub fn resolve_alt(alt_field: &str, index: usize) -> Option<&str> {
    if index == 0 {
        return None;
    }
    alt_field.split(',').nth(index - 1)
}

/// Return whether an alternate is a symbolic structural variant tag, e.g. `<DEL>`.
pub fn is_symbolic(alt: &str) -> bool {
    alt.starts_with('<')
}

/// Parse the `SVLEN` entry of an INFO field for the given (1-based) alternate.
///
/// A single value applies to every alternate.
pub fn parse_svlen(info: &str, index: usize) -> Option<Length> {
    let value = info
        .split(';')
        .find_map(|entry| entry.strip_prefix("SVLEN="))?;
    let values: Vec<&str> = value.split(',').collect();
    let chosen = if values.len() == 1 {
        values[0]
    } else {
        *values.get(index.checked_sub(1)?)?
    };
    chosen.trim().parse().ok()
}

/// Classify one allele call of a row.
pub fn classify(
    reference: &str,
    alt_field: &str,
    info: &str,
    call: AlleleCall,
) -> Result<VariantKind, ClassifyError> {
    let index = match call {
        AlleleCall::NoCall => return Ok(VariantKind::NoCall),
        AlleleCall::Reference => return Ok(VariantKind::Reference),
        AlleleCall::Alternative(index) => index,
    };
    let alt = resolve_alt(alt_field, index).ok_or(ClassifyError::AltIndex(index))?;

    let length = if is_symbolic(alt) {
        let length = parse_svlen(info, index).ok_or(ClassifyError::SvLen)?;
        // some callers report deletion lengths as positive
        if alt.starts_with("<DEL") && length > 0 {
            -length
        } else {
            length
        }
    } else {
        alt.len() as Length - reference.len() as Length
    };
    Ok(VariantKind::from_length(length))
}

/// An insertion or deletion as handed to the display layer.
///
/// Carries presentation data only; it never influences synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub variant_type: VariantType,
    pub start: Position,
    pub length: Length,
    pub score: Option<f32>,
}

/// A single-base substitution as handed to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnpVariant {
    pub position: Position,
    pub reference: char,
    pub alternative: char,
    pub score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genotype_parse() {
        let gt = Genotype::parse("0|1").unwrap();
        assert!(gt.phased);
        assert_eq!(gt.call(AlleleType::Paternal), AlleleCall::Reference);
        assert_eq!(gt.call(AlleleType::Maternal), AlleleCall::Alternative(1));

        let gt = Genotype::parse("./2").unwrap();
        assert!(!gt.phased);
        assert_eq!(gt.paternal, AlleleCall::NoCall);
        assert_eq!(gt.maternal, AlleleCall::Alternative(2));

        assert_eq!(Genotype::parse("0/1:35"), None);
        assert_eq!(Genotype::parse("1"), None);
        assert_eq!(Genotype::parse("1-1"), None);
    }

    #[test]
    fn test_classify_sequences() {
        let alt = AlleleCall::Alternative(1);
        assert_eq!(
            classify("A", "AGGGG", ".", alt),
            Ok(VariantKind::Insertion(4))
        );
        assert_eq!(classify("ACGT", "A", ".", alt), Ok(VariantKind::Deletion(-3)));
        assert_eq!(classify("A", "G", ".", alt), Ok(VariantKind::Snp));
        assert_eq!(
            classify("A", "G,AT", ".", AlleleCall::Alternative(2)),
            Ok(VariantKind::Insertion(1))
        );
        assert_eq!(
            classify("A", "G", ".", AlleleCall::Alternative(3)),
            Err(ClassifyError::AltIndex(3))
        );
        assert_eq!(classify("A", "G", ".", AlleleCall::NoCall), Ok(VariantKind::NoCall));
        assert_eq!(
            classify("A", "G", ".", AlleleCall::Reference),
            Ok(VariantKind::Reference)
        );
    }

    #[test]
    fn test_classify_symbolic() {
        let alt = AlleleCall::Alternative(1);
        assert_eq!(
            classify("N", "<INS>", "SVTYPE=INS;SVLEN=120;END=10", alt),
            Ok(VariantKind::Insertion(120))
        );
        assert_eq!(
            classify("N", "<DEL>", "SVTYPE=DEL;SVLEN=-50", alt),
            Ok(VariantKind::Deletion(-50))
        );
        assert_eq!(
            classify("N", "<DEL>", "SVLEN=50", alt),
            Ok(VariantKind::Deletion(-50))
        );
        assert_eq!(
            classify("N", "<INS>", "SVTYPE=INS", alt),
            Err(ClassifyError::SvLen)
        );
        assert_eq!(
            classify("N", "<INS>", "SVLEN=abc", alt),
            Err(ClassifyError::SvLen)
        );
    }

    #[test]
    fn test_kind_from_length() {
        assert_eq!(VariantKind::from_length(3).variant_type(), Some(VariantType::Insertion));
        assert_eq!(VariantKind::from_length(-3).variant_type(), Some(VariantType::Deletion));
        assert_eq!(VariantKind::from_length(0), VariantKind::Snp);
        assert_eq!(VariantKind::NoCall.variant_type(), None);
    }

    #[test]
    fn test_parse_svlen_list() {
        assert_eq!(parse_svlen("SVLEN=-5,12", 2), Some(12));
        assert_eq!(parse_svlen("SVLEN=-5,12", 3), None);
        assert_eq!(parse_svlen("DP=3;SVLEN=7", 2), Some(7));
        assert_eq!(parse_svlen("MYSVLEN=7", 1), None);
    }

    #[test]
    fn test_allele_type_from_str() {
        assert_eq!("Paternal".parse::<AlleleType>().unwrap(), AlleleType::Paternal);
        assert_eq!("b".parse::<AlleleType>().unwrap(), AlleleType::Maternal);
        assert!("third".parse::<AlleleType>().is_err());
    }
}
