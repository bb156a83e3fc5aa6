//! Static table of commercial AWS regions.

use tunnelgate_common::Location;

/// `(key, city, country, latitude, longitude)`, sorted by key.
const AWS_REGIONS: &[(&str, &str, &str, f64, f64)] = &[
    ("af-south-1", "Cape Town", "Africa", -33.9253, 18.4239),
    ("ap-east-1", "Hong Kong", "Asia Pacific", 22.3050, 114.1850),
    ("ap-northeast-1", "Tokyo", "Asia Pacific", 35.6870, 139.7495),
    ("ap-northeast-2", "Seoul", "Asia Pacific", 37.5600, 126.9900),
    ("ap-northeast-3", "Osaka", "Asia Pacific", 34.6939, 135.5022),
    ("ap-south-1", "Mumbai", "Asia Pacific", 19.0761, 72.8775),
    ("ap-south-2", "Hyderabad", "Asia Pacific", 17.3850, 78.4867),
    ("ap-southeast-1", "Singapore", "Asia Pacific", 1.3000, 103.8000),
    ("ap-southeast-2", "Sydney", "Asia Pacific", -33.8678, 151.2100),
    ("ap-southeast-3", "Jakarta", "Asia Pacific", -6.1750, 106.8275),
    ("ap-southeast-4", "Melbourne", "Asia Pacific", -37.8142, 144.9631),
    ("ca-central-1", "Montreal", "Canada", 45.5089, -73.5617),
    ("ca-west-1", "Calgary", "Canada", 51.0500, -114.0667),
    ("eu-central-1", "Frankfurt", "Europe", 50.1106, 8.6822),
    ("eu-central-2", "Zurich", "Europe", 47.3744, 8.5411),
    ("eu-north-1", "Stockholm", "Europe", 59.3294, 18.0686),
    ("eu-south-1", "Milan", "Europe", 45.4669, 9.1900),
    ("eu-south-2", "Zaragoza", "Europe", 41.6500, -0.8833),
    ("eu-west-1", "Dublin", "Europe", 53.3497, -6.2603),
    ("eu-west-2", "London", "Europe", 51.5072, -0.1275),
    ("eu-west-3", "Paris", "Europe", 48.8567, 2.3522),
    ("il-central-1", "Tel Aviv", "Israel", 32.0800, 34.7800),
    ("me-central-1", "Dubai", "Middle East", 25.2631, 55.2972),
    ("me-south-1", "Manama", "Middle East", 26.2167, 50.5833),
    ("sa-east-1", "Sao Paulo", "South America", -23.5504, -46.6339),
    ("us-east-1", "Ashburn", "US East", 39.0300, -77.4711),
    ("us-east-2", "Columbus", "US East", 39.9625, -83.0061),
    ("us-west-1", "San Francisco", "US West", 37.7749, -122.4194),
    ("us-west-2", "Portland", "US West", 45.5200, -122.6819),
];

/// All AWS regions the gateway template can be deployed to.
#[must_use]
pub fn aws_locations() -> Vec<Location> {
    AWS_REGIONS
        .iter()
        .map(|&(key, city, country, latitude, longitude)| Location {
            key: key.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
        })
        .collect()
}
