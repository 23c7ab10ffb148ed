//! Pure energy allocation for one network tick.
//!
//! [`allocate`] takes the staged offers, consumer requests and battery
//! limits of a network, each slice sorted by machine position, and decides
//! every transfer. It owns no state, so the network can compute the whole
//! tick before committing any of it.
//!
//! The allocation always balances on raw fixed-point units:
//!
//! ```text
//! sum(offers) + sum(discharged) == sum(grants) + sum(charged) + sum(returned)
//! ```

use fabrica_core::ledger::{EnergyAmount, even_fill, proportional_split};
use tracing::trace;

use crate::config::PartialPower;

/// What a battery can take and give this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryLimits {
    pub accept: EnergyAmount,
    pub release: EnergyAmount,
}

/// Per-machine transfers decided for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Energy granted to each consumer.
    pub grants: Vec<EnergyAmount>,
    /// Energy pushed into each battery.
    pub charged: Vec<EnergyAmount>,
    /// Energy pulled out of each battery.
    pub discharged: Vec<EnergyAmount>,
    /// Unused energy handed back to each generator.
    pub returned: Vec<EnergyAmount>,
}

fn total(amounts: &[EnergyAmount]) -> EnergyAmount {
    amounts.iter().copied().sum()
}

/// Decide every transfer for one tick.
///
/// 1. Consumers are served from generator offers, proportionally to their
///    requests when supply falls short.
/// 2. Surplus is spread evenly over batteries with headroom; what no
///    battery can take goes back to the generators pro-rata.
/// 3. A deficit is drawn evenly from charged batteries and handed to
///    consumers in proportion to their unmet request.
///
/// Under [`PartialPower::Stall`] a consumer that would receive less than
/// its full request receives nothing; the freed energy first stays in the
/// batteries it would have come from, then goes to battery headroom, then
/// back to the generators.
pub fn allocate(
    offers: &[EnergyAmount],
    requests: &[EnergyAmount],
    batteries: &[BatteryLimits],
    policy: PartialPower,
) -> Allocation {
    let offered = total(offers);
    let requested = total(requests);
    let accepts: Vec<EnergyAmount> = batteries.iter().map(|b| b.accept).collect();
    let releases: Vec<EnergyAmount> = batteries.iter().map(|b| b.release).collect();

    let mut grants = proportional_split(offered, requests);
    let mut charged = vec![EnergyAmount::ZERO; batteries.len()];
    let mut discharged = vec![EnergyAmount::ZERO; batteries.len()];
    let mut residual = EnergyAmount::ZERO;

    if offered >= requested {
        let surplus = offered.saturating_sub(requested);
        charged = even_fill(surplus, &accepts);
        residual = surplus.saturating_sub(total(&charged));
    } else {
        let deficit = requested.saturating_sub(offered);
        discharged = even_fill(deficit, &releases);
        let unmet: Vec<EnergyAmount> = requests
            .iter()
            .zip(&grants)
            .map(|(r, g)| r.saturating_sub(*g))
            .collect();
        let top_up = proportional_split(total(&discharged), &unmet);
        for (grant, extra) in grants.iter_mut().zip(top_up) {
            *grant = *grant + extra;
        }
    }

    if policy == PartialPower::Stall {
        let mut freed = EnergyAmount::ZERO;
        for (grant, request) in grants.iter_mut().zip(requests) {
            if *grant < *request {
                freed = freed + *grant;
                *grant = EnergyAmount::ZERO;
            }
        }
        if !freed.is_zero() {
            trace!(%freed, "stalled consumers released their partial grants");
            let drawn = total(&discharged);
            let kept_in_batteries = freed.min(drawn);
            discharged = even_fill(drawn.saturating_sub(kept_in_batteries), &discharged);

            let spare = freed.saturating_sub(kept_in_batteries);
            let headroom: Vec<EnergyAmount> = accepts
                .iter()
                .zip(&charged)
                .map(|(a, c)| a.saturating_sub(*c))
                .collect();
            let extra = even_fill(spare, &headroom);
            residual = residual + spare.saturating_sub(total(&extra));
            for (c, e) in charged.iter_mut().zip(extra) {
                *c = *c + e;
            }
        }
    }

    let returned = proportional_split(residual, offers);
    trace!(
        %offered,
        %requested,
        charged = %total(&charged),
        discharged = %total(&discharged),
        returned = %residual,
        "allocation decided"
    );

    Allocation {
        grants,
        charged,
        discharged,
        returned,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
