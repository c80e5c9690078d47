//! Command-line interface: argument parsing and per-run-mode parameter
//! validation.
//!
//! Each run mode has a fixed set of required parameters; `validate`
//! reports every missing one (and every missing path) at once before any
//! reader is opened.

use std::path::{Path, PathBuf};

use clap::Parser;
use strum_macros::{Display, EnumString};

use crate::err::AppError;

/// The ten run-mode selectors. Two-letter variants reload a previously
/// serialized registry instead of rebuilding it (see [`RunMode::reloads_registry`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum RunMode {
    A,
    #[strum(serialize = "AC")]
    Ac,
    D,
    #[strum(serialize = "DC")]
    Dc,
    F,
    #[strum(serialize = "FC")]
    Fc,
    P,
    #[strum(serialize = "PC")]
    Pc,
    X,
    #[strum(serialize = "XC")]
    Xc,
}

impl RunMode {
    pub fn reloads_registry(self) -> bool {
        matches!(self, RunMode::A | RunMode::Ac | RunMode::Dc | RunMode::Fc | RunMode::Pc | RunMode::Xc)
    }

    /// Parameter names this mode requires, in the order they should be
    /// reported if missing.
    fn required_parameter_names(self) -> &'static [&'static str] {
        match self {
            RunMode::A | RunMode::Ac => {
                &["template-fq1", "template-fq2", "donor-fastqs", "varcon-in", "out"]
            }
            RunMode::D => &["donor-vcf", "donor-bam", "acceptor-bam", "out", "reference"],
            RunMode::Dc => &["donor-vcf", "donor-bam", "out", "reference", "varcon-in"],
            RunMode::F => &[
                "donor-vcf",
                "donor-bam",
                "acceptor-bam",
                "template-fq1",
                "template-fq2",
                "out",
                "reference",
            ],
            // FC re-loads a payload-less registry and must re-fetch donor
            // reads to append, so it still needs the original acceptor and
            // donor alignments as inputs even though it never rebuilds
            // contexts from them.
            RunMode::Fc => &[
                "donor-vcf",
                "donor-bam",
                "acceptor-bam",
                "template-fq1",
                "template-fq2",
                "out",
                "reference",
                "varcon-in",
            ],
            RunMode::P | RunMode::X => {
                &["donor-vcf", "donor-bam", "acceptor-bam", "out", "reference"]
            }
            RunMode::Pc | RunMode::Xc => {
                &["donor-vcf", "donor-bam", "out", "reference", "varcon-in"]
            }
        }
    }
}

/// Command-line arguments shared by every run mode; unused fields for a
/// given mode are simply left unset.
#[derive(Parser, Debug)]
#[command(name = "vaseforge", about = "Builds synthetic validation FASTQ sets carrying donor variants")]
pub struct Args {
    /// Run mode: one of A, AC, D, DC, F, FC, P, PC, X, XC.
    #[arg(long = "run-mode", value_parser = parse_run_mode)]
    pub run_mode: RunMode,

    #[arg(long = "donor-vcf")]
    pub donor_vcf: Option<PathBuf>,
    #[arg(long = "donor-bam")]
    pub donor_bam: Option<PathBuf>,
    #[arg(long = "acceptor-bam")]
    pub acceptor_bam: Option<PathBuf>,
    #[arg(long = "reference")]
    pub reference: Option<PathBuf>,
    #[arg(long = "varcon-in")]
    pub varcon_in: Option<PathBuf>,
    #[arg(long = "donor-fastqs")]
    pub donor_fastqs: Option<PathBuf>,

    /// Comma-or-space separated, in lane order.
    #[arg(long = "template-fq1", value_delimiter = ',')]
    pub template_fq1: Vec<PathBuf>,
    /// Comma-or-space separated, in lane order.
    #[arg(long = "template-fq2", value_delimiter = ',')]
    pub template_fq2: Vec<PathBuf>,

    #[arg(long = "out")]
    pub out: Option<PathBuf>,

    /// Overrides the substituted-FASTQ filename stem (defaults to `out`).
    #[arg(long = "fastq-out-stem")]
    pub fastq_out_stem: Option<PathBuf>,

    /// Overrides the log file location (defaults to `VaSeBuilder.log`).
    #[arg(long = "log")]
    pub log: Option<PathBuf>,

    /// Number of sample-parallel worker threads; 1 disables parallelism.
    #[arg(long = "threads", default_value_t = 1)]
    pub threads: usize,

    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

fn parse_run_mode(raw: &str) -> Result<RunMode, String> {
    raw.parse::<RunMode>().map_err(|_| format!("unknown run mode {raw:?}"))
}

/// One missing-parameter or missing-path complaint, accumulated so every
/// problem is reported at once instead of failing on the first.
struct Missing(Vec<String>);

impl Args {
    fn param(&self, name: &str) -> Option<&Path> {
        match name {
            "donor-vcf" => self.donor_vcf.as_deref(),
            "donor-bam" => self.donor_bam.as_deref(),
            "acceptor-bam" => self.acceptor_bam.as_deref(),
            "reference" => self.reference.as_deref(),
            "varcon-in" => self.varcon_in.as_deref(),
            "donor-fastqs" => self.donor_fastqs.as_deref(),
            "out" => self.out.as_deref(),
            "template-fq1" => self.template_fq1.first().map(|p| p.as_path()),
            "template-fq2" => self.template_fq2.first().map(|p| p.as_path()),
            _ => unreachable!("unknown parameter name {name:?}"),
        }
    }

    fn is_set(&self, name: &str) -> bool {
        match name {
            "template-fq1" => !self.template_fq1.is_empty(),
            "template-fq2" => !self.template_fq2.is_empty(),
            _ => self.param(name).is_some(),
        }
    }

    /// Validates that every parameter the selected run mode requires is
    /// present, and that every path-valued parameter it requires exists.
    /// Fails fast with every problem named at once, before any reader is
    /// opened.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Missing(Vec::new());

        for name in self.run_mode.required_parameter_names() {
            if !self.is_set(name) {
                missing.0.push((*name).to_owned());
            }
        }

        if !missing.0.is_empty() {
            return Err(AppError::MissingParameters {
                run_mode: self.run_mode.to_string(),
                missing: missing.0.join(", "),
            });
        }

        for name in self.run_mode.required_parameter_names() {
            if matches!(*name, "template-fq1" | "template-fq2") {
                let lanes = if *name == "template-fq1" { &self.template_fq1 } else { &self.template_fq2 };
                for path in lanes {
                    if !path.exists() {
                        return Err(AppError::PathNotFound(path.clone()));
                    }
                }
            } else if let Some(path) = self.param(name) {
                if !path.exists() {
                    return Err(AppError::PathNotFound(path.to_path_buf()));
                }
            }
        }

        Ok(())
    }

    pub fn fastq_out_stem(&self) -> PathBuf {
        self.fastq_out_stem.clone().unwrap_or_else(|| {
            self.out.clone().unwrap_or_else(|| PathBuf::from(".")).join("vaseforge")
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.log.clone().unwrap_or_else(|| PathBuf::from("VaSeBuilder.log"))
    }
}
