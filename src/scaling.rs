//! Magnitude scaling relations

use std::collections::BTreeMap;

use crate::models::{Fault, Rupture};

/// Leonard (2014) constant for dip-slip ruptures.
pub const LEONARD_DIP_SLIP: f64 = 4.0;
/// Leonard (2014) constant for strike-slip ruptures.
pub const LEONARD_STRIKE_SLIP: f64 = 3.99;

/// Moment magnitude from rupture area (km²) using Leonard (2014).
///
/// A rake whose nearest multiple of 90° is odd (±90°) selects the dip-slip
/// constant; anything else is treated as strike-slip. Halfway rakes (45°,
/// 135°, ...) round to the even multiple and so count as strike-slip.
pub fn a_to_mw_leonard(
    area_km2: f64,
    dip_slip_constant: f64,
    strike_slip_constant: f64,
    rake: f64,
) -> f64 {
    let quadrant = (rake.rem_euclid(360.0) / 90.0).round_ties_even() as i64;
    let constant = if quadrant % 2 == 1 {
        dip_slip_constant
    } else {
        strike_slip_constant
    };
    area_km2.log10() + constant
}

/// Seismic moment (N·m) for a moment magnitude.
pub fn mag_to_moment(mw: f64) -> f64 {
    10f64.powf(1.5 * mw + 9.05)
}

/// Moment magnitude for a seismic moment (N·m).
pub fn moment_to_mag(moment: f64) -> f64 {
    (moment.log10() - 9.05) / 1.5
}

/// Estimate the magnitude contributed by each fault of a rupture.
///
/// The total magnitude comes from the total area and mean rake; its moment
/// is split between faults in proportion to their area.
pub fn estimate_fault_magnitudes(
    faults: &BTreeMap<String, Fault>,
    rakes: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let total_area: f64 = faults.values().map(Fault::area_km2).sum();
    if total_area <= 0.0 {
        return BTreeMap::new();
    }

    let mean_rake = if rakes.is_empty() {
        0.0
    } else {
        rakes.values().sum::<f64>() / rakes.len() as f64
    };
    let total_mw = a_to_mw_leonard(
        total_area,
        LEONARD_DIP_SLIP,
        LEONARD_STRIKE_SLIP,
        mean_rake,
    );
    let total_moment = mag_to_moment(total_mw);

    faults
        .iter()
        .filter(|(_, fault)| fault.area_km2() > 0.0)
        .map(|(name, fault)| {
            let share = fault.area_km2() / total_area;
            (name.clone(), moment_to_mag(share * total_moment))
        })
        .collect()
}

/// Magnitude shown in the results table: Leonard estimate over all faults at rake 0.
pub fn rupture_magnitude(rupture: &Rupture) -> f64 {
    let area: f64 = rupture.faults.values().map(Fault::area_km2).sum();
    a_to_mw_leonard(area, LEONARD_DIP_SLIP, LEONARD_STRIKE_SLIP, 0.0)
}
