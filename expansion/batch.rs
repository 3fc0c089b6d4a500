//! Independent expansions for many functions at once (e.g. one per spatial bin).
//!
//! Every expansion owns its scratch buffers, so the work is spread over the rayon
//! pool without any shared mutable state.

use crate::config::ExpansionConfig;
use crate::model::{Envelope, ExpansionError, GaussHermiteExpansion};
use rayon::prelude::*;

/// Builds one expansion per function, in parallel. Results keep the input order.
///
/// `envelope` applies to every function; pass `None` to fit each envelope separately.
pub fn expand_all<F>(
    functions: &[F],
    order: usize,
    envelope: Option<Envelope>,
    config: &ExpansionConfig,
) -> Vec<Result<GaussHermiteExpansion, ExpansionError>>
where
    F: Fn(f64) -> f64 + Sync,
{
    log::debug!(
        "Expanding {} functions to order {} on {} threads",
        functions.len(),
        order,
        rayon::current_num_threads()
    );
    functions
        .par_iter()
        .map(|fnc| GaussHermiteExpansion::new(fnc, order, envelope, config))
        .collect()
}
