//! 旅行规划演示工具：天气 / 航班 / 酒店 / 景点（确定性 Mock 数据）
//!
//! 缺少必填字段属于领域级失败，写入响应的 error 字段，不返回 ToolError。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::{RunContext, ToolError};
use crate::tools::TypedTool;

/// 由字符串得到稳定的伪随机种子（FNV-1a），同样的输入得到同样的 Mock 数据。
/// 不用 rand：测试和演示要求输出可复现，且无需引入随机数依赖。
fn seed(parts: &[&str]) -> u64 {
    parts.iter().flat_map(|p| p.bytes()).fold(1469598103934665603u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(1099511628211)
    })
}

fn pick<'a>(items: &'a [&'a str], seed: u64, salt: u64) -> &'a str {
    items[((seed.wrapping_add(salt.wrapping_mul(7919))) % items.len() as u64) as usize]
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WeatherRequest {
    /// City name to get weather for
    #[serde(default)]
    pub city: String,
    /// Date in YYYY-MM-DD format (optional)
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct WeatherResponse {
    pub city: String,
    pub temperature: i32,
    pub condition: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct WeatherTool;

#[async_trait]
impl TypedTool for WeatherTool {
    type Request = WeatherRequest;
    type Response = WeatherResponse;

    const NAME: &'static str = "get_weather";
    const DESCRIPTION: &'static str = "Get weather information for a specific city and date";

    async fn call(&self, _ctx: &RunContext, req: WeatherRequest) -> Result<WeatherResponse, ToolError> {
        if req.city.is_empty() {
            return Ok(WeatherResponse {
                error: Some("City is required".into()),
                ..Default::default()
            });
        }
        let (temperature, condition) = match req.city.as_str() {
            "Beijing" => (15, "Sunny"),
            "Shanghai" => (20, "Cloudy"),
            "Tokyo" => (18, "Rainy"),
            "Paris" => (12, "Overcast"),
            "New York" => (8, "Snow"),
            other => {
                let s = seed(&[other, &req.date]);
                (
                    5 + (s % 30) as i32,
                    pick(&["Sunny", "Cloudy", "Rainy", "Overcast"], s, 1),
                )
            }
        };
        Ok(WeatherResponse {
            city: req.city,
            temperature,
            condition: condition.to_string(),
            date: req.date,
            error: None,
        })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FlightRequest {
    /// Departure city
    #[serde(default)]
    pub from: String,
    /// Destination city
    #[serde(default)]
    pub to: String,
    /// Departure date in YYYY-MM-DD format
    #[serde(default)]
    pub date: String,
    /// Number of passengers
    #[serde(default = "default_one")]
    pub passengers: u32,
}

fn default_one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Flight {
    pub airline: String,
    pub flight_no: String,
    pub departure: String,
    pub arrival: String,
    pub price: u32,
    pub duration: String,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct FlightResponse {
    pub flights: Vec<Flight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct FlightSearchTool;

#[async_trait]
impl TypedTool for FlightSearchTool {
    type Request = FlightRequest;
    type Response = FlightResponse;

    const NAME: &'static str = "search_flights";
    const DESCRIPTION: &'static str = "Search for flights between cities";

    async fn call(&self, _ctx: &RunContext, req: FlightRequest) -> Result<FlightResponse, ToolError> {
        if req.from.is_empty() || req.to.is_empty() {
            return Ok(FlightResponse {
                flights: Vec::new(),
                error: Some("From and To cities are required".into()),
            });
        }
        const AIRLINES: [&str; 5] = [
            "Air China",
            "China Eastern",
            "China Southern",
            "United Airlines",
            "Delta",
        ];
        let s = seed(&[&req.from, &req.to, &req.date]);
        let flights = (0..3u64)
            .map(|i| {
                let v = s.rotate_left(i as u32 * 13);
                let airline = pick(&AIRLINES, v, i);
                Flight {
                    airline: airline.to_string(),
                    flight_no: format!("{}{}", &airline[..2].to_uppercase(), 1000 + v % 9000),
                    departure: format!("{:02}:{:02}", v % 24, (v >> 8) % 60),
                    arrival: format!("{:02}:{:02}", (v >> 16) % 24, (v >> 24) % 60),
                    price: (500 + (v >> 32) % 2000) as u32 * req.passengers.max(1),
                    duration: format!("{}h {}m", 1 + (v >> 40) % 12, (v >> 48) % 60),
                }
            })
            .collect();
        Ok(FlightResponse {
            flights,
            error: None,
        })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HotelRequest {
    /// City to search hotels in
    #[serde(default)]
    pub city: String,
    /// Check-in date in YYYY-MM-DD format
    #[serde(default)]
    pub check_in: String,
    /// Check-out date in YYYY-MM-DD format
    #[serde(default)]
    pub check_out: String,
    /// Number of guests
    #[serde(default = "default_one")]
    pub guests: u32,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Hotel {
    pub name: String,
    pub rating: f64,
    pub price: u32,
    pub location: String,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct HotelResponse {
    pub hotels: Vec<Hotel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct HotelSearchTool;

#[async_trait]
impl TypedTool for HotelSearchTool {
    type Request = HotelRequest;
    type Response = HotelResponse;

    const NAME: &'static str = "search_hotels";
    const DESCRIPTION: &'static str = "Search for hotels in a city";

    async fn call(&self, _ctx: &RunContext, req: HotelRequest) -> Result<HotelResponse, ToolError> {
        if req.city.is_empty() {
            return Ok(HotelResponse {
                hotels: Vec::new(),
                error: Some("City is required".into()),
            });
        }
        const NAMES: [&str; 5] = [
            "Grand Hotel",
            "City Center Inn",
            "Luxury Resort",
            "Budget Lodge",
            "Business Hotel",
        ];
        const AMENITIES: [&[&str]; 5] = [
            &["WiFi", "Pool", "Gym", "Spa"],
            &["WiFi", "Breakfast", "Parking"],
            &["WiFi", "Pool", "Restaurant", "Bar", "Concierge"],
            &["WiFi", "Breakfast"],
            &["WiFi", "Business Center", "Meeting Rooms"],
        ];
        let s = seed(&[&req.city, &req.check_in, &req.check_out]);
        let hotels = (0..4u64)
            .map(|i| {
                let v = s.rotate_left(i as u32 * 11);
                Hotel {
                    name: format!("{} {}", req.city, pick(&NAMES, v, i)),
                    rating: (20 + v % 30) as f64 / 10.0,
                    price: 50 + ((v >> 16) % 300) as u32,
                    location: format!("{} Downtown", req.city),
                    amenities: AMENITIES[((v >> 24) % 5) as usize]
                        .iter()
                        .map(|a| a.to_string())
                        .collect(),
                }
            })
            .collect();
        Ok(HotelResponse {
            hotels,
            error: None,
        })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AttractionRequest {
    /// City to search attractions in
    #[serde(default)]
    pub city: String,
    /// Category of attractions (museum, park, landmark, etc.)
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Attraction {
    pub name: String,
    pub description: String,
    pub rating: f64,
    pub open_hours: String,
    pub ticket_price: u32,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct AttractionResponse {
    pub attractions: Vec<Attraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn attraction(name: &str, description: &str, rating: f64, hours: &str, price: u32, category: &str) -> Attraction {
    Attraction {
        name: name.to_string(),
        description: description.to_string(),
        rating,
        open_hours: hours.to_string(),
        ticket_price: price,
        category: category.to_string(),
    }
}

fn known_attractions(city: &str) -> Option<Vec<Attraction>> {
    let list = match city {
        "Beijing" => vec![
            attraction("Forbidden City", "Ancient imperial palace", 4.8, "8:30-17:00", 60, "landmark"),
            attraction("Great Wall", "Historic fortification", 4.9, "6:00-18:00", 45, "landmark"),
            attraction("Temple of Heaven", "Imperial sacrificial altar", 4.6, "6:00-22:00", 35, "landmark"),
        ],
        "Paris" => vec![
            attraction("Eiffel Tower", "Iconic iron lattice tower", 4.7, "9:30-23:45", 25, "landmark"),
            attraction("Louvre Museum", "World's largest art museum", 4.8, "9:00-18:00", 17, "museum"),
            attraction("Notre-Dame Cathedral", "Medieval Catholic cathedral", 4.5, "8:00-18:45", 0, "landmark"),
        ],
        "Tokyo" => vec![
            attraction("Senso-ji Temple", "Ancient Buddhist temple", 4.4, "6:00-17:00", 0, "landmark"),
            attraction("Tokyo National Museum", "Largest collection of cultural artifacts", 4.3, "9:30-17:00", 1000, "museum"),
            attraction("Ueno Park", "Large public park with museums", 4.2, "5:00-23:00", 0, "park"),
        ],
        _ => return None,
    };
    Some(list)
}

pub struct AttractionSearchTool;

#[async_trait]
impl TypedTool for AttractionSearchTool {
    type Request = AttractionRequest;
    type Response = AttractionResponse;

    const NAME: &'static str = "search_attractions";
    const DESCRIPTION: &'static str = "Search for tourist attractions in a city";

    async fn call(
        &self,
        _ctx: &RunContext,
        req: AttractionRequest,
    ) -> Result<AttractionResponse, ToolError> {
        if req.city.is_empty() {
            return Ok(AttractionResponse {
                attractions: Vec::new(),
                error: Some("City is required".into()),
            });
        }
        let attractions = match known_attractions(&req.city) {
            Some(list) if req.category.is_empty() => list,
            Some(list) => list
                .into_iter()
                .filter(|a| a.category == req.category)
                .collect(),
            None => {
                const NAMES: [&str; 5] = [
                    "Central Museum",
                    "City Park",
                    "Historic Square",
                    "Art Gallery",
                    "Cultural Center",
                ];
                const CATEGORIES: [&str; 5] = ["museum", "park", "landmark", "gallery", "cultural"];
                let s = seed(&[&req.city]);
                (0..3u64)
                    .map(|i| {
                        let v = s.rotate_left(i as u32 * 17);
                        attraction(
                            &format!("{} {}", req.city, pick(&NAMES, v, i)),
                            "Popular tourist attraction",
                            (30 + v % 20) as f64 / 10.0,
                            "9:00-17:00",
                            ((v >> 8) % 50) as u32,
                            pick(&CATEGORIES, v >> 16, i),
                        )
                    })
                    .collect()
            }
        };
        Ok(AttractionResponse {
            attractions,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolOutput, Typed};
    use serde_json::json;

    #[tokio::test]
    async fn test_weather_known_city_and_missing_city() {
        let ctx = RunContext::new();
        let out = Typed(WeatherTool)
            .execute(&ctx, json!({"city": "Beijing", "date": "2025-10-01"}))
            .await
            .unwrap();
        let ToolOutput::Done(v) = out else { panic!("expected Done") };
        assert_eq!(v["temperature"], 15);
        assert_eq!(v["condition"], "Sunny");
        assert!(v.get("error").is_none());

        let out = Typed(WeatherTool).execute(&ctx, json!({})).await.unwrap();
        let ToolOutput::Done(v) = out else { panic!("expected Done") };
        assert_eq!(v["error"], "City is required");
    }

    #[tokio::test]
    async fn test_flights_are_deterministic() {
        let ctx = RunContext::new();
        let args = json!({"from": "New York", "to": "Beijing", "date": "2025-10-01", "passengers": 2});
        let a = Typed(FlightSearchTool).execute(&ctx, args.clone()).await.unwrap();
        let b = Typed(FlightSearchTool).execute(&ctx, args).await.unwrap();
        assert_eq!(a, b);
        let ToolOutput::Done(v) = a else { panic!("expected Done") };
        assert_eq!(v["flights"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_flights_require_endpoints() {
        let out = FlightSearchTool
            .call(
                &RunContext::new(),
                FlightRequest {
                    from: String::new(),
                    to: "Paris".into(),
                    date: String::new(),
                    passengers: 1,
                },
            )
            .await
            .unwrap();
        assert!(out.flights.is_empty());
        assert!(out.error.is_some());
    }

    #[tokio::test]
    async fn test_hotels_and_attraction_filter() {
        let ctx = RunContext::new();
        let hotels = HotelSearchTool
            .call(
                &ctx,
                HotelRequest {
                    city: "Tokyo".into(),
                    check_in: "2025-10-01".into(),
                    check_out: "2025-10-04".into(),
                    guests: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(hotels.hotels.len(), 4);
        assert!(hotels.hotels.iter().all(|h| h.rating >= 2.0 && h.rating < 5.0));

        let museums = AttractionSearchTool
            .call(
                &ctx,
                AttractionRequest {
                    city: "Paris".into(),
                    category: "museum".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(museums.attractions.len(), 1);
        assert_eq!(museums.attractions[0].name, "Louvre Museum");
    }
}
