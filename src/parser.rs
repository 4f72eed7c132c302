//! Build log line classification and parsing
//!
//! Three line shapes carry meaning, checked in this order:
//! - Configuration header: a compile command line containing the header marker,
//!   e.g. `(cd /w/pkg; GOPATH=/w/gopath GOROOT=/w/goroots/Base ... -gcflags=all=-d=ssa/all/time=1 .)`
//! - Package marker: `# <package>`
//! - Timing line: `<path>:<line>:<col>\t<phase>\tTIME(ns)\t<nanos>\t<func-or-method>`
//!
//! Every other line is ignored.

use crate::aggregate::CompilationKey;
use crate::error::{PhaseTimesError, PhaseTimesResult};
use crate::intern::Interner;
use crate::phase_index::{PhaseId, PhaseIndex};
use std::rc::Rc;

/// Compiler flag that enables timing for every SSA phase
pub const DEFAULT_HEADER_MARKER: &str = "gcflags=all=-d=ssa/all/time=1";

const TIMING_MARKER: &str = "TIME(ns)";
const PACKAGE_PREFIX: &str = "# ";
const PARENT_SEGMENT: &str = "../";

/// One phase timing for one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub configuration: Rc<str>,
    pub key: CompilationKey,
    pub phase: PhaseId,
    pub nanos: u64,
}

/// What a single input line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Configuration(Rc<str>),
    Package(Rc<str>),
    Timing(Timing),
    Ignored,
}

/// Stateful parser for a build log, one line at a time
#[derive(Debug)]
pub struct LineParser {
    header_marker: String,
    line_no: usize,
    configuration: Option<Rc<str>>,
    package: Rc<str>,
    gopath: Rc<str>,
    goroot: Rc<str>,
    pwd: Rc<str>,
}

impl LineParser {
    pub fn new(header_marker: impl Into<String>) -> Self {
        Self {
            header_marker: header_marker.into(),
            line_no: 0,
            configuration: None,
            package: Rc::from("UNSET_PACKAGE"),
            gopath: Rc::from("UNSET_GOPATH"),
            goroot: Rc::from("UNSET_GOROOT"),
            pwd: Rc::from("UNSET_PWD"),
        }
    }

    /// Number of lines parsed so far (1-based number of the last line)
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn gopath(&self) -> &str {
        &self.gopath
    }

    pub fn goroot(&self) -> &str {
        &self.goroot
    }

    pub fn pwd(&self) -> &str {
        &self.pwd
    }

    /// Classify and parse the next line of input
    pub fn parse_line(
        &mut self,
        line: &str,
        interner: &mut Interner,
        phases: &mut PhaseIndex,
    ) -> PhaseTimesResult<LineEvent> {
        self.line_no += 1;

        if line.contains(self.header_marker.as_str()) {
            return self.parse_header(line, interner);
        }

        if let Some(rest) = line.strip_prefix(PACKAGE_PREFIX) {
            self.package = interner.intern(rest.trim());
            return Ok(LineEvent::Package(Rc::clone(&self.package)));
        }

        if line.contains(TIMING_MARKER) {
            return self
                .parse_timing(line, interner, phases)
                .map(LineEvent::Timing);
        }

        Ok(LineEvent::Ignored)
    }

    fn parse_header(&mut self, line: &str, interner: &mut Interner) -> PhaseTimesResult<LineEvent> {
        let pwd = extract_prefixed(line, "(cd ", self.line_no)?;
        let gopath = extract_prefixed(line, "GOPATH=", self.line_no)?;
        let goroot = extract_prefixed(line, "GOROOT=", self.line_no)?;

        let name = match goroot.rfind('/') {
            Some(i) if i + 1 < goroot.len() => &goroot[i + 1..],
            _ => {
                return Err(PhaseTimesError::path_structure(
                    self.line_no,
                    format!("GOROOT {goroot:?} lacks trailing configuration segment"),
                ))
            }
        };

        self.pwd = interner.intern(pwd);
        self.gopath = interner.intern(gopath);
        self.goroot = interner.intern(goroot);
        let name = interner.intern(name);
        self.configuration = Some(Rc::clone(&name));

        tracing::debug!(
            line = self.line_no,
            configuration = %name,
            goroot = %self.goroot,
            "configuration header"
        );
        Ok(LineEvent::Configuration(name))
    }

    fn parse_timing(
        &mut self,
        line: &str,
        interner: &mut Interner,
        phases: &mut PhaseIndex,
    ) -> PhaseTimesResult<Timing> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(PhaseTimesError::grammar(
                self.line_no,
                format!(
                    "timing line has {} tab-separated fields, expected at least 5",
                    fields.len()
                ),
            ));
        }

        let Some(configuration) = self.configuration.clone() else {
            return Err(PhaseTimesError::grammar(
                self.line_no,
                "timing line appears before any configuration header",
            ));
        };

        let phase = phases.index(interner.intern(fields[1]));
        let nanos = fields[3]
            .parse::<u64>()
            .map_err(|source| PhaseTimesError::NumericFormat {
                line: self.line_no,
                value: fields[3].to_string(),
                source,
            })?;
        let function = interner.intern(fields[4]);
        let locator = interner.intern(&self.normalize_locator(fields[0])?);

        Ok(Timing {
            configuration,
            key: CompilationKey {
                package: Rc::clone(&self.package),
                locator,
                function,
            },
            phase,
            nanos,
        })
    }

    /// Resolve leading `../` against the working directory, then replace a
    /// GOPATH or GOROOT root with a literal `GOPATH/` or `GOROOT/` prefix.
    pub fn normalize_locator(&self, raw: &str) -> PhaseTimesResult<String> {
        let mut locator = raw;
        let joined;
        if locator.starts_with(PARENT_SEGMENT) {
            let mut prefix: &str = &self.pwd;
            while let Some(rest) = locator.strip_prefix(PARENT_SEGMENT) {
                locator = rest;
                let cut = prefix.rfind('/').ok_or_else(|| {
                    PhaseTimesError::path_structure(
                        self.line_no,
                        format!(
                            "../ removal ran out of path resolving {raw:?} against {:?}",
                            self.pwd
                        ),
                    )
                })?;
                prefix = &prefix[..cut];
            }
            joined = format!("{prefix}/{locator}");
            locator = &joined;
        }

        if let Some(rest) = strip_root(locator, &self.gopath) {
            return Ok(format!("GOPATH/{rest}"));
        }
        if let Some(rest) = strip_root(locator, &self.goroot) {
            return Ok(format!("GOROOT/{rest}"));
        }
        Ok(locator.to_string())
    }
}

/// The space-terminated word following `prefix`, without a trailing `;` or `/`
fn extract_prefixed<'a>(line: &'a str, prefix: &str, line_no: usize) -> PhaseTimesResult<&'a str> {
    let start = line.find(prefix).ok_or_else(|| {
        PhaseTimesError::grammar(
            line_no,
            format!("configuration header is missing {prefix:?} prefixed string"),
        )
    })?;
    let rest = &line[start + prefix.len()..];
    let word = rest.split(' ').next().unwrap_or_default();
    let word = word.strip_suffix(';').unwrap_or(word);
    let word = word.strip_suffix('/').unwrap_or(word);
    if word.is_empty() {
        return Err(PhaseTimesError::grammar(
            line_no,
            format!("configuration header has an empty value after {prefix:?}"),
        ));
    }
    Ok(word)
}

fn strip_root<'a>(locator: &'a str, root: &str) -> Option<&'a str> {
    locator.strip_prefix(root)?.strip_prefix('/')
}
