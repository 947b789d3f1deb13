use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use splat_ply::{PointSet, ReadError, Schema, SchemaDiff, SchemaError, ShDegree, WriteError};
use thiserror::Error;

use crate::config::MergeConfig;
use crate::store::{RecordStore, SchemaMismatch};

/// What a file's schema was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    /// The canonical layout of the configured degree. `found` is the degree the
    /// file's own `f_rest_*` count implies, if it implies one.
    Degree {
        expected: ShDegree,
        found: Option<ShDegree>,
    },
    /// The schema established by the inputs merged before it.
    EarlierInputs,
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degree { expected, found } => {
                write!(f, "SH degree {expected}")?;
                match found {
                    Some(found) if found == expected => Ok(()),
                    Some(found) => write!(f, " (file has SH degree {found})"),
                    None => f.write_str(" (file matches no SH degree)"),
                }
            }
            Self::EarlierInputs => f.write_str("the earlier inputs"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    InvalidDegree(#[from] SchemaError),

    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("{} does not match the layout of {against}: {diff}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        against: SchemaSource,
        diff: SchemaDiff,
    },

    #[error("No valid input .ply files were found to merge.")]
    NoValidInput,

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub enum MergeMessage<'a> {
    /// An input was read and its records appended.
    Loaded { path: &'a Path, points: usize },
    /// An input did not exist and was left out.
    Skipped { path: &'a Path },
    /// All inputs are in, the output is about to be written.
    Saving { path: &'a Path, points: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub path: PathBuf,
    pub points: usize,
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub loaded: Vec<InputSummary>,
    pub skipped: Vec<PathBuf>,
    pub total_points: usize,
    pub properties: usize,
    pub output: PathBuf,
}

impl MergeReport {
    pub fn files_loaded(&self) -> usize {
        self.loaded.len()
    }

    pub fn files_skipped(&self) -> usize {
        self.skipped.len()
    }
}

type Loaded = Option<(Schema, PointSet)>;

// Missing inputs are not an error, they are reported as `None`.
fn load_input(path: &Path) -> Result<Loaded, MergeError> {
    match splat_ply::open(path) {
        Ok(loaded) => Ok(Some(loaded)),
        Err(ReadError::NotFound(_)) => Ok(None),
        Err(source) => Err(MergeError::Read {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Merge without progress reporting.
pub fn merge(config: &MergeConfig) -> Result<MergeReport, MergeError> {
    merge_with(config, |_| {})
}

/// Merge all inputs into one file, calling `on_message` as inputs are processed.
///
/// Nothing is written unless every existing input reads cleanly and shares one layout.
pub fn merge_with(
    config: &MergeConfig,
    mut on_message: impl FnMut(MergeMessage<'_>),
) -> Result<MergeReport, MergeError> {
    let degree = config.degree()?;

    let mut store = RecordStore::new();
    let mut loaded = vec![];
    let mut skipped = vec![];

    let mut add = |path: &Path, input: Loaded| -> Result<(), MergeError> {
        let Some((schema, points)) = input else {
            log::warn!("Skipping (not found): {}", path.display());
            skipped.push(path.to_owned());
            on_message(MergeMessage::Skipped { path });
            return Ok(());
        };

        let expected = Schema::for_degree(degree, schema.options());
        if let Some(diff) = expected.diff(&schema) {
            return Err(MergeError::SchemaMismatch {
                path: path.to_owned(),
                against: SchemaSource::Degree {
                    expected: degree,
                    found: schema.sh_degree(),
                },
                diff,
            });
        }

        let count = points.len();
        store
            .append(schema, points)
            .map_err(|SchemaMismatch(diff)| MergeError::SchemaMismatch {
                path: path.to_owned(),
                against: SchemaSource::EarlierInputs,
                diff,
            })?;

        log::info!("Merged {count} points from: {}", path.display());
        loaded.push(InputSummary {
            path: path.to_owned(),
            points: count,
        });
        on_message(MergeMessage::Loaded {
            path,
            points: count,
        });
        Ok(())
    };

    if config.parallel {
        log::info!(
            "Reading {} inputs on {} threads",
            config.inputs.len(),
            rayon::current_num_threads()
        );
        // Reads may finish in any order, collecting keeps the input order.
        let inputs: Vec<_> = config
            .inputs
            .par_iter()
            .map(|path| load_input(path))
            .collect();
        for (path, input) in config.inputs.iter().zip(inputs) {
            add(path.as_path(), input?)?;
        }
    } else {
        for path in &config.inputs {
            add(path.as_path(), load_input(path)?)?;
        }
    }

    let Some((schema, points)) = store.finish() else {
        return Err(MergeError::NoValidInput);
    };

    let total_points = points.len();
    let output = splat_ply::resolve_output_path(&config.output);
    log::info!(
        "Saving merged {total_points} points to: {}",
        output.display()
    );
    on_message(MergeMessage::Saving {
        path: &output,
        points: total_points,
    });

    let comments = vec![
        "Merged by splat-merge".to_owned(),
        format!("Merged from {} files", loaded.len()),
    ];
    splat_ply::write_file(&output, &schema, &points, &comments)?;

    Ok(MergeReport {
        loaded,
        skipped,
        total_points,
        properties: schema.len(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_ply::SchemaOptions;

    #[test]
    fn test_invalid_degree_checked_first() {
        // The input doesn't exist, a degree error must come before anything else.
        let config = MergeConfig::new(vec!["missing.ply".into()], "out.ply").with_sh_degree(7);
        let err = merge(&config).unwrap_err();
        assert!(
            matches!(err, MergeError::InvalidDegree(SchemaError::InvalidDegree(7))),
            "{err:?}"
        );

        let config = config.with_sh_degree(-2);
        assert!(matches!(
            merge(&config),
            Err(MergeError::InvalidDegree(_))
        ));
    }

    #[test]
    fn test_no_inputs() {
        let config = MergeConfig::new(vec![], "out.ply");
        assert!(matches!(merge(&config), Err(MergeError::NoValidInput)));
    }

    #[test]
    fn test_error_messages() {
        let d3 = ShDegree::MAX;
        let schema = Schema::for_degree(d3, SchemaOptions::default());
        let radius = Schema::for_degree(
            d3,
            SchemaOptions {
                radius: true,
                ..schema.options()
            },
        );
        let err = MergeError::SchemaMismatch {
            path: "b.ply".into(),
            against: SchemaSource::EarlierInputs,
            diff: schema.diff(&radius).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "b.ply does not match the layout of the earlier inputs: \
             property #59: unexpected extra property `radius`"
        );

        let d1 = Schema::for_degree(ShDegree::new(1).unwrap(), SchemaOptions::default());
        let err = MergeError::SchemaMismatch {
            path: "c.ply".into(),
            against: SchemaSource::Degree {
                expected: d3,
                found: d1.sh_degree(),
            },
            diff: schema.diff(&d1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "c.ply does not match the layout of SH degree 3 (file has SH degree 1): \
             property #15: expected `f_rest_9`, found `opacity`"
        );

        let against = SchemaSource::Degree {
            expected: d3,
            found: None,
        };
        assert_eq!(
            against.to_string(),
            "SH degree 3 (file matches no SH degree)"
        );
    }
}
