//! Quality-factor tie-breaking between equally specific HTTP functions.

use crate::function::HttpFunction;
use crate::media::{MediaType, CLIENT_QUALITY, SERVER_QUALITY};
use std::sync::Arc;

/// `(client q, server qs)` for every pairing of an accepted type with a
/// type the function produces. A function without produced types pairs
/// with every accepted type at `qs = 1`.
fn qualities<'a>(
    func: &'a HttpFunction,
    accepts: &'a [MediaType],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    accepts.iter().flat_map(move |accept| {
        let q = accept.quality(CLIENT_QUALITY);
        let pairs: Vec<(f64, f64)> = if func.produces().is_empty() {
            vec![(q, 1.0)]
        } else {
            func.produces()
                .iter()
                .filter(|produce| produce.matches(accept))
                .map(|produce| (q, produce.quality(SERVER_QUALITY)))
                .collect()
        };
        pairs
    })
}

/// Narrow `funcs` to those reaching the best client quality, then, if that
/// still leaves several, to those also reaching the best server quality.
///
/// The result may still hold more than one function.
pub(crate) fn best_quality(
    funcs: &[Arc<HttpFunction>],
    accepts: &[MediaType],
) -> Vec<Arc<HttpFunction>> {
    let client_qf = funcs
        .iter()
        .flat_map(|f| qualities(f, accepts))
        .map(|(q, _)| q)
        .fold(0.0_f64, f64::max);
    let server_qf = funcs
        .iter()
        .flat_map(|f| qualities(f, accepts))
        .filter(|(q, _)| *q == client_qf)
        .map(|(_, qs)| qs)
        .fold(0.0_f64, f64::max);

    let by_client: Vec<Arc<HttpFunction>> = funcs
        .iter()
        .filter(|f| qualities(f, accepts).any(|(q, _)| q == client_qf))
        .map(Arc::clone)
        .collect();
    if by_client.len() <= 1 {
        return by_client;
    }

    by_client
        .into_iter()
        .filter(|f| qualities(f, accepts).any(|(q, qs)| q == client_qf && qs == server_qf))
        .collect()
}
