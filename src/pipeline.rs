//! The four batch jobs, each a parameterisation of the mutator.

use crate::billing::{BillingClient, BillingError, CouponRequest};
use crate::error::{BatchError, Result};
use crate::mutator::{BatchMutator, Pacer, RunSummary};
use crate::row::{DecodePolicy, RowSource};
use crate::selection::{FieldMapping, Selection};
use log::info;
use std::fmt;
use std::path::PathBuf;

/// A batch job against the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    /// Cancel subscriptions whose column 13 starts with the prefix.
    RemoveSubscriptions,

    /// Delete customers whose column 3 starts with the prefix.
    RemoveCustomers,

    /// Create a single-use 100% coupon for every code in the coupon file.
    UploadCoupons,

    /// Delete every coupon listed in the coupon file.
    DeleteCoupons,
}

impl Pipeline {
    /// All pipelines in the order the binary runs them.
    pub const ALL: [Pipeline; 4] = [
        Pipeline::RemoveSubscriptions,
        Pipeline::RemoveCustomers,
        Pipeline::UploadCoupons,
        Pipeline::DeleteCoupons,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pipeline::RemoveSubscriptions => "remove-subscriptions",
            Pipeline::RemoveCustomers => "remove-customers",
            Pipeline::UploadCoupons => "upload-coupons",
            Pipeline::DeleteCoupons => "delete-coupons",
        }
    }

    /// Input file, relative to the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Pipeline::RemoveSubscriptions => "subscriptions.csv",
            Pipeline::RemoveCustomers => "unified_customers.csv",
            Pipeline::UploadCoupons | Pipeline::DeleteCoupons => "coupons.csv",
        }
    }

    /// Column layout of the input file.
    ///
    /// The two exports carry a header row; the coupon file is a bare list of
    /// codes and its first line is data.
    pub fn mapping(&self) -> FieldMapping {
        match self {
            Pipeline::RemoveSubscriptions => FieldMapping::with_header(13, 0),
            Pipeline::RemoveCustomers => FieldMapping::with_header(3, 0),
            Pipeline::UploadCoupons | Pipeline::DeleteCoupons => FieldMapping::every_row(0),
        }
    }

    /// Returns `true` if the pipeline filters rows by prefix.
    pub fn needs_prefix(&self) -> bool {
        self.mapping().match_field.is_some()
    }

    /// Builds the selection for this pipeline from an optional prefix.
    ///
    /// An empty prefix counts as missing: it would select every row.
    pub fn selection(&self, prefix: Option<&str>) -> Result<Selection> {
        if !self.needs_prefix() {
            return Ok(Selection::All);
        }
        prefix
            .filter(|p| !p.is_empty())
            .map(Selection::prefix)
            .ok_or(BatchError::MissingPrefix {
                pipeline: self.name(),
            })
    }

    /// Applies this pipeline's remote mutation to one identifier.
    pub fn apply<C: BillingClient + ?Sized>(
        &self,
        client: &C,
        id: &str,
    ) -> std::result::Result<(), BillingError> {
        match self {
            Pipeline::RemoveSubscriptions => client.cancel_subscription(id),
            Pipeline::RemoveCustomers => client.delete_customer(id),
            Pipeline::UploadCoupons => {
                client.create_coupon(&CouponRequest::single_use_full_discount(id))
            }
            Pipeline::DeleteCoupons => client.delete_coupon(id),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where and how a pipeline reads its input.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub delimiter: u8,
    pub decode_policy: DecodePolicy,

    /// Literal prefix for the filtered pipelines.
    pub prefix: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            data_dir: PathBuf::from("."),
            delimiter: b',',
            decode_policy: DecodePolicy::FailFast,
            prefix: None,
        }
    }
}

impl RunOptions {
    pub fn input_path(&self, pipeline: Pipeline) -> PathBuf {
        self.data_dir.join(pipeline.file_name())
    }
}

/// Runs one pipeline end to end: read, select, mutate.
///
/// The selection is resolved before the input file is opened, so a missing
/// prefix never costs any I/O.
pub fn run_pipeline<C, P>(
    pipeline: Pipeline,
    options: &RunOptions,
    client: &C,
    mutator: &mut BatchMutator<P>,
) -> Result<RunSummary>
where
    C: BillingClient + ?Sized,
    P: Pacer,
{
    let selection = pipeline.selection(options.prefix.as_deref())?;
    let path = options.input_path(pipeline);
    info!("{}: reading {}", pipeline, path.display());

    let rows = RowSource::open(&path, options.delimiter)?.collect_rows(options.decode_policy)?;

    let summary = mutator.run(&rows, &pipeline.mapping(), &selection, |id| {
        pipeline.apply(client, id)
    })?;

    info!(
        "{}: {} rows, {} selected, {} completed",
        pipeline, summary.rows, summary.selected, summary.completed
    );
    Ok(summary)
}
