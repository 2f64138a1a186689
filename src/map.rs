//! Plotly choropleth figure for a rupture's faults

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::geometry::{fault_feature, feature_collection};
use crate::models::Rupture;
use crate::views::format_rate;

const CENTER_LAT: f64 = -43.0;
const CENTER_LON: f64 = 172.0;
const ZOOM: f64 = 6.0;

const HOVER_TEMPLATE: &str = "<b>%{hovertext}</b><br>\
     Width (km): %{customdata[0]}<br>\
     Length (km): %{customdata[1]}<br>\
     Segments: %{customdata[2]}<br>\
     Mean Segment Rupture Rate: %{customdata[3]}<extra></extra>";

/// Build the figure coloured by mean segment rupture rate.
///
/// Faults without geometry are skipped. `fault_rates` holds the summed annual
/// rate of each parent fault; faults missing from it are drawn with rate 0.
pub fn rupture_figure(rupture: &Rupture, fault_rates: &BTreeMap<String, f64>) -> Value {
    let mut features = Vec::new();
    let mut locations = Vec::new();
    let mut z = Vec::new();
    let mut custom_data = Vec::new();

    for (name, fault) in rupture.faults.iter().filter(|(_, fault)| !fault.is_empty()) {
        let segments = fault.planes.len();
        let mean_rate = fault_rates.get(name).copied().unwrap_or(0.0) / segments as f64;
        let width = fault.width_km().round() as i64;
        let length = fault.length_km().round() as i64;

        let mut properties = Map::new();
        properties.insert("Name".to_string(), json!(name));
        properties.insert("Width (km)".to_string(), json!(width));
        properties.insert("Length (km)".to_string(), json!(length));
        properties.insert("Segments".to_string(), json!(segments));
        properties.insert("Mean Segment Rupture Rate".to_string(), json!(mean_rate));

        features.push(fault_feature(fault, properties));
        locations.push(name.clone());
        z.push(mean_rate);
        custom_data.push(json!([width, length, segments, format_rate(mean_rate)]));
    }

    json!({
        "data": [{
            "type": "choroplethmap",
            "geojson": feature_collection(features),
            "featureidkey": "id",
            "hovertext": locations.clone(),
            "locations": locations,
            "z": z,
            "customdata": custom_data,
            "hovertemplate": HOVER_TEMPLATE,
            "colorscale": "Plasma",
            "showscale": false,
            "marker": { "opacity": 0.5 },
        }],
        "layout": {
            "map": {
                "style": "carto-positron",
                "center": { "lat": CENTER_LAT, "lon": CENTER_LON },
                "zoom": ZOOM,
            },
            "margin": { "l": 0, "r": 0, "b": 0, "t": 0 },
            "showlegend": false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::rectangular_fault;
    use crate::models::Fault;

    fn rupture() -> Rupture {
        let mut faults = BTreeMap::new();
        let mut alpine = rectangular_fault("Alpine", 20.0, 12.0);
        alpine.planes.push(alpine.planes[0].clone());
        faults.insert("Alpine".to_string(), alpine);
        faults.insert("Hope".to_string(), rectangular_fault("Hope", 8.0, 15.0));
        faults.insert(
            "Ohariu".to_string(),
            Fault {
                name: "Ohariu".to_string(),
                rake: 0.0,
                planes: Vec::new(),
            },
        );
        Rupture {
            rupture_id: 1,
            magnitude: 7.5,
            area: 1e9,
            length: 5e4,
            rate: 1e-5,
            faults,
        }
    }

    #[test]
    fn test_empty_faults_are_skipped() {
        let figure = rupture_figure(&rupture(), &BTreeMap::new());
        let trace = &figure["data"][0];
        assert_eq!(trace["locations"], json!(["Alpine", "Hope"]));
        assert_eq!(trace["geojson"]["features"].as_array().unwrap().len(), 2);
        assert_eq!(trace["z"], json!([0.0, 0.0]));
    }

    #[test]
    fn test_rate_is_averaged_over_segments() {
        let mut rates = BTreeMap::new();
        rates.insert("Alpine".to_string(), 0.004);
        rates.insert("Hope".to_string(), 0.001);

        let figure = rupture_figure(&rupture(), &rates);
        let trace = &figure["data"][0];
        assert_eq!(trace["z"], json!([0.002, 0.001]));
        assert_eq!(trace["customdata"][0], json!([12, 40, 2, "2.00e-3"]));
        assert_eq!(trace["customdata"][1], json!([15, 8, 1, "1.00e-3"]));

        let alpine = &trace["geojson"]["features"][0];
        assert_eq!(alpine["id"], "Alpine");
        assert_eq!(alpine["properties"]["Segments"], 2);
    }

    #[test]
    fn test_layout_centres_on_new_zealand() {
        let figure = rupture_figure(&rupture(), &BTreeMap::new());
        assert_eq!(figure["layout"]["map"]["center"]["lat"], -43.0);
        assert_eq!(figure["layout"]["showlegend"], false);
    }
}
