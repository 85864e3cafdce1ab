//! Secret signatures for the pre-push scanner.
//!
//! A signature is a regex plus optional filters (minimum Shannon entropy, a
//! suspicious variable name). [`SignatureSet`] compiles the built-in corpus
//! together with configured extras, and reports matches with masked snippets
//! only. The same set backs [`SignatureSet::redact_string`], the last safety
//! net applied to user-facing error text.

use anyhow::{Context, Result};
use regex::{Regex, RegexSet};
use std::sync::LazyLock;

pub mod masking;

pub use masking::{mask_secret, shannon_entropy};

// =========================================================================
// Canonical Signature Definitions
// =========================================================================

/// Definition of a built-in secret signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureDef {
    /// Unique identifier reported in findings (e.g., "github_pat")
    pub id: &'static str,
    /// Category for grouping in reports
    pub category: &'static str,
    /// The regex. A `value` group, when present, is the part that gets masked.
    pub regex: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Minimum Shannon entropy of the whole match, if any
    pub min_entropy: Option<f64>,
    /// Require the `name` group to look like a credential name
    pub suspicious_name: bool,
}

/// Configuration provider for signature settings.
///
/// Keeps `SignatureSet` decoupled from the concrete config type.
pub trait SignatureConfigProvider {
    fn extra_signatures(&self) -> &[String];
    fn ignore_signatures(&self) -> &[String];
}

/// Built-in signature corpus, highest priority first.
///
/// When two signatures cover overlapping text on a line, the earlier one wins,
/// so specific token formats sit above the generic assignment heuristics.
pub static DEFAULT_SIGNATURES: &[SignatureDef] = &[
    SignatureDef {
        id: "aws_access_key_id",
        category: "Cloud Credentials",
        regex: r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
        description: "AWS access key IDs",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "private_key",
        category: "Private Keys",
        regex: r"-----BEGIN (?:RSA |OPENSSH |DSA |EC |PGP |ENCRYPTED )?PRIVATE KEY(?: BLOCK)?-----",
        description: "PEM and OpenSSH private key headers",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "github_pat",
        category: "Source Control Tokens",
        regex: r"ghp_[0-9A-Za-z]{36}",
        description: "GitHub personal access tokens",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "github_fine_grained_pat",
        category: "Source Control Tokens",
        regex: r"github_pat_[0-9A-Za-z_]{82}",
        description: "GitHub fine-grained personal access tokens",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "openai_api_key",
        category: "API Keys",
        regex: r"sk-[A-Za-z0-9]{48}",
        description: "OpenAI API keys",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "gcp_api_key",
        category: "Cloud Credentials",
        regex: r"AIza[0-9A-Za-z_-]{35}",
        description: "Google API keys",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "jwt_token",
        category: "Tokens",
        regex: r"eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
        description: "JSON Web Tokens",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "aws_secret_assignment",
        category: "Cloud Credentials",
        regex: r#"(?i)aws[_.-]*(?:secret|access|key)[_.-]*(?:access[_.-]*)?(?:key)?\s*[=:]\s*["']?(?P<value>[A-Za-z0-9/+=]{16,})"#,
        description: "AWS secret key assignments",
        min_entropy: Some(4.5),
        suspicious_name: false,
    },
    SignatureDef {
        id: "database_url",
        category: "Connection Strings",
        regex: r"(?i)(?:jdbc|mongodb|postgres(?:ql)?|mysql)[a-z+:]*://[^/\s:@]+:(?P<value>[^/\s@]+)@[^/\s]+",
        description: "Database URLs with embedded passwords",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "ssh_rsa_key",
        category: "Private Keys",
        regex: r"(?i)ssh-rsa\s+(?P<value>[A-Za-z0-9/+=]{32,})",
        description: "Inline ssh-rsa key material",
        min_entropy: None,
        suspicious_name: false,
    },
    SignatureDef {
        id: "bearer_token",
        category: "Tokens",
        regex: r"(?i)bearer\s+(?P<value>[A-Za-z0-9_.=-]{20,})",
        description: "Bearer authentication tokens",
        min_entropy: Some(4.0),
        suspicious_name: false,
    },
    SignatureDef {
        id: "api_key_assignment",
        category: "API Keys",
        regex: r#"(?i)api[_.-]?key[_.-]*\s*[=:]\s*["']?(?P<value>[A-Za-z0-9_-]{8,})"#,
        description: "API key assignments",
        min_entropy: Some(4.0),
        suspicious_name: false,
    },
    SignatureDef {
        id: "password_assignment",
        category: "Passwords",
        regex: r#"(?i)(?:password|passwd|pass|pwd)[_.-]?\s*[=:]\s*["']?(?P<value>[^\s"']{6,})"#,
        description: "Password assignments",
        min_entropy: Some(3.0),
        suspicious_name: false,
    },
    SignatureDef {
        id: "generic_secret",
        category: "Generic Secrets",
        regex: r#"(?i)(?:secret|token|credential)s?[_.-]?\s*[=:]\s*["']?(?P<value>[^\s"']{8,})"#,
        description: "Secret, token and credential assignments",
        min_entropy: Some(4.0),
        suspicious_name: false,
    },
    SignatureDef {
        id: "env_export",
        category: "Generic Secrets",
        regex: r#"(?i)export\s+(?P<name>\w+)\s*=\s*["']?(?P<value>[^\s"']{6,})"#,
        description: "Shell exports of credential-named variables",
        min_entropy: Some(4.0),
        suspicious_name: true,
    },
];

/// Values that are never secrets on their own.
const COMMON_VALUES: &[&str] = &[
    "true",
    "false",
    "none",
    "null",
    "undefined",
    "localhost",
    "password",
    "username",
    "user",
    "test",
    "example",
    "demo",
];

/// Fragments that make a variable name look like it holds a credential.
const SUSPICIOUS_NAME_TERMS: &[&str] = &[
    "token",
    "secret",
    "password",
    "pwd",
    "pass",
    "key",
    "auth",
    "credential",
    "api",
    "private",
    "cert",
    "ssh",
];

const MIN_VALUE_LEN: usize = 6;

/// All built-in signature definitions.
#[must_use]
pub fn default_signature_defs() -> &'static [SignatureDef] {
    DEFAULT_SIGNATURES
}

#[derive(Debug, Clone)]
struct CompiledSignature {
    id: String,
    regex: Regex,
    min_entropy: Option<f64>,
    suspicious_name: bool,
}

impl CompiledSignature {
    fn compile(
        id: &str,
        pattern: &str,
        min_entropy: Option<f64>,
        suspicious_name: bool,
    ) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Failed to compile signature '{id}': {pattern}"))?;
        Ok(Self {
            id: id.to_string(),
            regex,
            min_entropy,
            suspicious_name,
        })
    }

    /// Byte range of the secret part of an accepted match.
    fn accept(&self, caps: &regex::Captures<'_>) -> Option<(usize, usize)> {
        let whole = caps.get(0)?;
        let value = caps.name("value").unwrap_or(whole);

        if let Some(threshold) = self.min_entropy {
            let text = value.as_str();
            if text.chars().count() < MIN_VALUE_LEN
                || COMMON_VALUES.iter().any(|v| text.eq_ignore_ascii_case(v))
                || shannon_entropy(whole.as_str()) < threshold
            {
                return None;
            }
        }

        if self.suspicious_name {
            let name = caps.name("name")?.as_str().to_ascii_lowercase();
            if !SUSPICIOUS_NAME_TERMS.iter().any(|term| name.contains(term)) {
                return None;
            }
        }

        Some((value.start(), value.end()))
    }
}

/// One signature hit on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    pub signature_id: String,
    /// 1-based line number
    pub line_number: usize,
    /// Byte range of the secret within the line
    pub column_range: (usize, usize),
    /// Masked context around the match (never includes the secret)
    pub snippet: String,
}

/// Compiled signature corpus with a `RegexSet` prefilter.
#[derive(Debug, Clone)]
pub struct SignatureSet {
    default_signatures: Vec<CompiledSignature>,
    extra_signatures: Vec<CompiledSignature>,
    ignored: Vec<String>,

    // RegexSet for fast pre-filtering, plus the signatures at matching indices
    regex_set: RegexSet,
    linear: Vec<CompiledSignature>,
}

impl SignatureSet {
    /// Compile the built-in corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if a regex fails to compile.
    pub fn new() -> Result<Self> {
        let default_signatures = DEFAULT_SIGNATURES
            .iter()
            .map(|def| {
                CompiledSignature::compile(def.id, def.regex, def.min_entropy, def.suspicious_name)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut set = Self {
            default_signatures,
            extra_signatures: Vec::new(),
            ignored: Vec::new(),
            regex_set: RegexSet::empty(),
            linear: Vec::new(),
        };
        set.rebuild_regex_set()?;
        Ok(set)
    }

    /// Built-in corpus plus configured extras, minus ignored ids.
    ///
    /// Extra signatures get ids `extra_signature_<n>` in configuration order.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra signature fails to compile.
    pub fn from_config<T: SignatureConfigProvider>(config: &T) -> Result<Self> {
        let mut set = Self::new()?;

        set.ignored.extend(config.ignore_signatures().iter().cloned());

        for (idx, pattern) in config.extra_signatures().iter().enumerate() {
            set.extra_signatures.push(CompiledSignature::compile(
                &format!("extra_signature_{idx}"),
                pattern,
                None,
                false,
            )?);
        }

        set.rebuild_regex_set()?;
        Ok(set)
    }

    fn rebuild_regex_set(&mut self) -> Result<()> {
        let linear: Vec<CompiledSignature> = self
            .default_signatures
            .iter()
            .chain(self.extra_signatures.iter())
            .filter(|sig| !self.ignored.iter().any(|id| id == &sig.id))
            .cloned()
            .collect();

        self.regex_set = RegexSet::new(linear.iter().map(|sig| sig.regex.as_str()))
            .context("Failed to compile RegexSet for secret signatures")?;
        self.linear = linear;
        Ok(())
    }

    /// Add a signature at the lowest priority.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn add_extra_signature(&mut self, id: &str, pattern: &str) -> Result<()> {
        self.extra_signatures
            .push(CompiledSignature::compile(id, pattern, None, false)?);
        self.rebuild_regex_set()
    }

    /// Active signature ids in priority order.
    #[must_use]
    pub fn signature_ids(&self) -> Vec<&str> {
        self.linear.iter().map(|sig| sig.id.as_str()).collect()
    }

    /// Scan one line.
    ///
    /// Every accepted, non-overlapping match yields a [`SignatureMatch`]. The
    /// snippet of each shows the line with every secret on it masked.
    #[must_use]
    pub fn scan_line(&self, line: &str, line_number: usize) -> Vec<SignatureMatch> {
        let hits = self.regex_set.matches(line);
        if !hits.matched_any() {
            return Vec::new();
        }

        let mut accepted: Vec<(usize, usize, &str)> = Vec::new();
        for index in hits.iter() {
            let Some(sig) = self.linear.get(index) else {
                continue;
            };
            for caps in sig.regex.captures_iter(line) {
                let Some((start, end)) = sig.accept(&caps) else {
                    continue;
                };
                let overlaps = accepted
                    .iter()
                    .any(|&(s, e, _)| start < e && s < end);
                if !overlaps {
                    accepted.push((start, end, sig.id.as_str()));
                }
            }
        }

        accepted.sort_by_key(|&(start, _, _)| start);
        let spans: Vec<(usize, usize)> = accepted.iter().map(|&(s, e, _)| (s, e)).collect();
        let (masked, moved) = masking::mask_spans(line, &spans);

        accepted
            .iter()
            .zip(moved)
            .map(|(&(start, end, id), (m_start, m_end))| SignatureMatch {
                signature_id: id.to_string(),
                line_number,
                column_range: (start, end),
                snippet: masking::window(&masked, m_start, m_end, masking::SNIPPET_CONTEXT_CHARS)
                    .trim()
                    .to_string(),
            })
            .collect()
    }

    /// Scan every line of `content`.
    #[must_use]
    pub fn scan_content(&self, content: &str) -> Vec<SignatureMatch> {
        content
            .lines()
            .enumerate()
            .flat_map(|(idx, line)| self.scan_line(line, idx + 1))
            .collect()
    }

    /// Replace anything that looks like a secret with `***`.
    ///
    /// Filters are skipped here: for display text, a false positive is cheap.
    #[must_use]
    pub fn redact_string(&self, text: &str) -> String {
        let hits = self.regex_set.matches(text);
        if !hits.matched_any() {
            return text.to_string();
        }

        let mut redacted = text.to_string();
        for index in hits.iter() {
            if let Some(sig) = self.linear.get(index) {
                redacted = sig.regex.replace_all(&redacted, "***").into_owned();
            }
        }
        redacted
    }
}

static DEFAULT_SET: LazyLock<SignatureSet> =
    LazyLock::new(|| SignatureSet::new().expect("built-in signatures compile"));

/// Process-global set holding only the built-in signatures.
#[must_use]
pub fn default_signatures() -> &'static SignatureSet {
    &DEFAULT_SET
}
