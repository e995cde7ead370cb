//! Pure proration: split a total amount into per-parcel shares.
//!
//! Amounts are **integer cents** (`i64`), following the engine-wide
//! minor-units convention. Every method distributes leftover cents by
//! largest remainder so the shares always sum to the total exactly, with no
//! floating-point drift.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Weighting input for one parcel (area in square meters).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParcelWeight {
    pub parcel_id: Uuid,
    pub area: i64,
}

/// One caller-supplied share for the `Custom` method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomShare {
    pub parcel_id: Uuid,
    pub amount_cents: i64,
}

/// How a total is split across parcels.
///
/// Each variant carries everything its strategy needs, so the selection
/// happens once at the call site and adding a method never touches callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DistributionMethod {
    /// `total / parcel_count` for every parcel.
    #[default]
    Equal,
    /// Area-weighted: `amount_i = total * area_i / sum(area)`.
    BySurface,
    /// Explicit caller-supplied amounts. An empty or malformed list falls
    /// back to `Equal` and flags the fallback to the caller.
    Custom(Vec<CustomShare>),
}

/// One computed share.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParcelShare {
    pub parcel_id: Uuid,
    pub amount_cents: i64,
}

/// Result of a proration run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proration {
    pub shares: Vec<ParcelShare>,
    /// True when the requested method could not be honored (zero total
    /// area, empty/malformed custom list) and `Equal` was used instead.
    pub fell_back: bool,
}

impl Proration {
    pub fn total_cents(&self) -> i64 {
        self.shares.iter().map(|s| s.amount_cents).sum()
    }
}

/// Splits `total_cents` across `parcels` using `method`.
///
/// Fails with [`EngineError::Validation`] when the total is not positive or
/// the parcel set is empty; never fails on a degenerate weighting input
/// (those fall back to `Equal` instead).
pub fn prorate(
    total_cents: i64,
    parcels: &[ParcelWeight],
    method: &DistributionMethod,
) -> ResultEngine<Proration> {
    if total_cents <= 0 {
        return Err(EngineError::Validation(
            "total_amount_cents must be > 0".to_string(),
        ));
    }
    if parcels.is_empty() {
        return Err(EngineError::Validation(
            "no parcels to distribute".to_string(),
        ));
    }

    match method {
        DistributionMethod::Equal => Ok(Proration {
            shares: equal_shares(total_cents, parcels),
            fell_back: false,
        }),
        DistributionMethod::BySurface => {
            let total_area: i64 = parcels.iter().map(|p| p.area.max(0)).sum();
            if total_area == 0 {
                // All areas zero (or negative): 1/n weighting instead of a
                // division by zero.
                return Ok(Proration {
                    shares: equal_shares(total_cents, parcels),
                    fell_back: true,
                });
            }
            Ok(Proration {
                shares: weighted_shares(total_cents, parcels, total_area),
                fell_back: false,
            })
        }
        DistributionMethod::Custom(custom) => {
            if let Some(shares) = validated_custom(total_cents, parcels, custom) {
                Ok(Proration {
                    shares,
                    fell_back: false,
                })
            } else {
                Ok(Proration {
                    shares: equal_shares(total_cents, parcels),
                    fell_back: true,
                })
            }
        }
    }
}

fn equal_shares(total_cents: i64, parcels: &[ParcelWeight]) -> Vec<ParcelShare> {
    let n = parcels.len() as i64;
    let base = total_cents / n;
    let leftover = total_cents % n;

    parcels
        .iter()
        .enumerate()
        .map(|(i, parcel)| ParcelShare {
            parcel_id: parcel.parcel_id,
            amount_cents: base + i64::from((i as i64) < leftover),
        })
        .collect()
}

/// Largest-remainder area weighting: floor every share, then hand the
/// leftover cents to the parcels whose truncated fraction was biggest
/// (input order breaks ties deterministically).
fn weighted_shares(
    total_cents: i64,
    parcels: &[ParcelWeight],
    total_area: i64,
) -> Vec<ParcelShare> {
    let mut shares: Vec<ParcelShare> = Vec::with_capacity(parcels.len());
    // (remainder, input index) for leftover assignment.
    let mut remainders: Vec<(i128, usize)> = Vec::with_capacity(parcels.len());

    for (i, parcel) in parcels.iter().enumerate() {
        let area = i128::from(parcel.area.max(0));
        let numerator = i128::from(total_cents) * area;
        let base = numerator / i128::from(total_area);
        shares.push(ParcelShare {
            parcel_id: parcel.parcel_id,
            amount_cents: base as i64,
        });
        remainders.push((numerator % i128::from(total_area), i));
    }

    let assigned: i64 = shares.iter().map(|s| s.amount_cents).sum();
    let mut leftover = total_cents - assigned;

    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, index) in remainders {
        if leftover == 0 {
            break;
        }
        shares[index].amount_cents += 1;
        leftover -= 1;
    }

    shares
}

/// Returns the custom shares in parcel order when the list is well formed:
/// every parcel covered exactly once, every amount positive, and the sum
/// equal to the total. Anything else yields `None` (fallback to `Equal`).
fn validated_custom(
    total_cents: i64,
    parcels: &[ParcelWeight],
    custom: &[CustomShare],
) -> Option<Vec<ParcelShare>> {
    if custom.is_empty() || custom.len() != parcels.len() {
        return None;
    }

    let mut shares = Vec::with_capacity(parcels.len());
    for parcel in parcels {
        let matches: Vec<&CustomShare> = custom
            .iter()
            .filter(|c| c.parcel_id == parcel.parcel_id)
            .collect();
        let [share] = matches.as_slice() else {
            return None;
        };
        if share.amount_cents <= 0 {
            return None;
        }
        shares.push(ParcelShare {
            parcel_id: share.parcel_id,
            amount_cents: share.amount_cents,
        });
    }

    let sum: i64 = shares.iter().map(|s| s.amount_cents).sum();
    (sum == total_cents).then_some(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parcels(areas: &[i64]) -> Vec<ParcelWeight> {
        areas
            .iter()
            .map(|&area| ParcelWeight {
                parcel_id: Uuid::new_v4(),
                area,
            })
            .collect()
    }

    #[test]
    fn equal_three_parcels() {
        let parcels = parcels(&[10, 20, 30]);
        let result = prorate(300_000, &parcels, &DistributionMethod::Equal).unwrap();

        assert!(!result.fell_back);
        assert_eq!(result.shares.len(), 3);
        for share in &result.shares {
            assert_eq!(share.amount_cents, 100_000);
        }
    }

    #[test]
    fn equal_distributes_leftover_cents() {
        let parcels = parcels(&[1, 1, 1]);
        let result = prorate(100, &parcels, &DistributionMethod::Equal).unwrap();

        let amounts: Vec<i64> = result.shares.iter().map(|s| s.amount_cents).collect();
        assert_eq!(amounts, vec![34, 33, 33]);
        assert_eq!(result.total_cents(), 100);
    }

    #[test]
    fn by_surface_areas_one_two_three() {
        let parcels = parcels(&[1, 2, 3]);
        let result = prorate(300_000, &parcels, &DistributionMethod::BySurface).unwrap();

        let amounts: Vec<i64> = result.shares.iter().map(|s| s.amount_cents).collect();
        assert_eq!(amounts, vec![50_000, 100_000, 150_000]);
        assert!(!result.fell_back);
    }

    #[test]
    fn by_surface_double_area_doubles_share() {
        let parcels = parcels(&[50, 100]);
        let result = prorate(90_000, &parcels, &DistributionMethod::BySurface).unwrap();

        assert_eq!(result.shares[1].amount_cents, 2 * result.shares[0].amount_cents);
    }

    #[test]
    fn by_surface_sum_is_exact_with_awkward_weights() {
        let parcels = parcels(&[7, 11, 13]);
        let result = prorate(10_001, &parcels, &DistributionMethod::BySurface).unwrap();

        assert_eq!(result.total_cents(), 10_001);
    }

    #[test]
    fn by_surface_zero_area_falls_back_to_equal() {
        let parcels = parcels(&[0, 0]);
        let result = prorate(1_000, &parcels, &DistributionMethod::BySurface).unwrap();

        assert!(result.fell_back);
        let amounts: Vec<i64> = result.shares.iter().map(|s| s.amount_cents).collect();
        assert_eq!(amounts, vec![500, 500]);
    }

    #[test]
    fn custom_passthrough() {
        let parcels = parcels(&[1, 2]);
        let custom = vec![
            CustomShare {
                parcel_id: parcels[0].parcel_id,
                amount_cents: 700,
            },
            CustomShare {
                parcel_id: parcels[1].parcel_id,
                amount_cents: 300,
            },
        ];
        let result = prorate(1_000, &parcels, &DistributionMethod::Custom(custom)).unwrap();

        assert!(!result.fell_back);
        let amounts: Vec<i64> = result.shares.iter().map(|s| s.amount_cents).collect();
        assert_eq!(amounts, vec![700, 300]);
    }

    #[test]
    fn custom_empty_falls_back() {
        let parcels = parcels(&[1, 2]);
        let result = prorate(1_000, &parcels, &DistributionMethod::Custom(Vec::new())).unwrap();

        assert!(result.fell_back);
        assert_eq!(result.total_cents(), 1_000);
    }

    #[test]
    fn custom_sum_mismatch_falls_back() {
        let parcels = parcels(&[1, 2]);
        let custom = vec![
            CustomShare {
                parcel_id: parcels[0].parcel_id,
                amount_cents: 700,
            },
            CustomShare {
                parcel_id: parcels[1].parcel_id,
                amount_cents: 200,
            },
        ];
        let result = prorate(1_000, &parcels, &DistributionMethod::Custom(custom)).unwrap();

        assert!(result.fell_back);
    }

    #[test]
    fn custom_unknown_parcel_falls_back() {
        let parcels = parcels(&[1, 2]);
        let custom = vec![
            CustomShare {
                parcel_id: Uuid::new_v4(),
                amount_cents: 700,
            },
            CustomShare {
                parcel_id: parcels[1].parcel_id,
                amount_cents: 300,
            },
        ];
        let result = prorate(1_000, &parcels, &DistributionMethod::Custom(custom)).unwrap();

        assert!(result.fell_back);
    }

    #[test]
    fn empty_parcel_set_is_rejected() {
        let err = prorate(1_000, &[], &DistributionMethod::Equal).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("no parcels to distribute".to_string())
        );
    }

    #[test]
    fn non_positive_total_is_rejected() {
        let parcels = parcels(&[1]);
        assert!(prorate(0, &parcels, &DistributionMethod::Equal).is_err());
        assert!(prorate(-5, &parcels, &DistributionMethod::Equal).is_err());
    }
}
