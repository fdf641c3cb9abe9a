use anyhow::{Context, Result};
use log::debug;
use reqwest::{header, StatusCode, Url};
use serde::{Deserialize, Deserializer};

use crate::settings::LookupSettings;

use super::{LookupError, NormalizedProduct, NutritionLookup};

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default, deserialize_with = "lenient_number")]
    status: Option<f64>,
    #[serde(default)]
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    image_small_url: Option<String>,
    #[serde(default)]
    nutriments: Nutriments,
}

#[derive(Debug, Default, Deserialize)]
struct Nutriments {
    #[serde(rename = "energy-kcal", default, deserialize_with = "lenient_number")]
    energy_kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    proteins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    carbohydrates: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fiber: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sodium: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

// Upstream occasionally encodes numbers as strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(value)) => Some(value),
        Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Maps an Open Food Facts v2 product body into a [`NormalizedProduct`].
pub fn parse_product(body: &str) -> Result<NormalizedProduct, LookupError> {
    let response: ProductResponse =
        serde_json::from_str(body).map_err(|err| LookupError::Malformed(err.to_string()))?;

    if response.status == Some(0.0) {
        return Err(LookupError::NotFound);
    }
    let product = response.product.ok_or(LookupError::NotFound)?;
    let name = non_blank(product.product_name)
        .ok_or_else(|| LookupError::Malformed("product has no name".into()))?;

    let n = product.nutriments;
    Ok(NormalizedProduct {
        name,
        brand: non_blank(product.brands),
        image_url: non_blank(product.image_small_url),
        calories: n.energy_kcal,
        protein_g: n.proteins,
        carbs_g: n.carbohydrates,
        fat_g: n.fat,
        fiber_g: n.fiber,
        sodium_g: n.sodium,
    })
}

pub struct OpenFoodFactsClient {
    http_client: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, Option<String>)>,
}

impl OpenFoodFactsClient {
    pub fn new(settings: &LookupSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid lookup base URL '{}'", settings.base_url))?;

        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            credentials: settings
                .username
                .clone()
                .map(|user| (user, settings.password.clone())),
        })
    }

    pub fn product_url(&self, barcode: &str) -> Result<Url, LookupError> {
        let file_name = format!("{barcode}.json");
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v2", "product", file_name.as_str()]);
        Ok(url)
    }
}

impl NutritionLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<NormalizedProduct, LookupError> {
        let url = self.product_url(barcode)?;
        debug!("Fetching product {barcode} from {url}");

        let mut request = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json");
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_product(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_complete_product() {
        let body = r#"{
            "code": "012345",
            "status": 1,
            "product": {
                "product_name": "Test Bar",
                "brands": "Acme",
                "image_small_url": "https://images.example/012345.200.jpg",
                "nutriments": {
                    "energy-kcal": 200,
                    "proteins": 10,
                    "carbohydrates": 20,
                    "fat": 5,
                    "fiber": 2,
                    "sodium": 0.1
                }
            }
        }"#;

        let product = parse_product(body).unwrap();
        assert_eq!(product.name, "Test Bar");
        assert_eq!(product.brand.as_deref(), Some("Acme"));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://images.example/012345.200.jpg")
        );
        assert_eq!(product.calories, Some(200.0));
        assert_eq!(product.protein_g, Some(10.0));
        assert_eq!(product.carbs_g, Some(20.0));
        assert_eq!(product.fat_g, Some(5.0));
        assert_eq!(product.fiber_g, Some(2.0));
        assert_eq!(product.sodium_g, Some(0.1));
    }

    #[test]
    fn missing_nutrients_are_absent_not_errors() {
        let body = r#"{"product": {"product_name": "Mystery Snack"}}"#;
        let product = parse_product(body).unwrap();
        assert_eq!(product.name, "Mystery Snack");
        assert_eq!(product.brand, None);
        assert_eq!(product.calories, None);
        assert_eq!(product.sodium_g, None);
    }

    #[test]
    fn numeric_strings_and_nulls_are_tolerated() {
        let body = r#"{"product": {"product_name": "Tea", "nutriments": {
            "energy-kcal": "2.5", "proteins": null, "fat": "n/a"
        }}}"#;
        let product = parse_product(body).unwrap();
        assert_eq!(product.calories, Some(2.5));
        assert_eq!(product.protein_g, None);
        assert_eq!(product.fat_g, None);
    }

    #[test]
    fn not_found_and_malformed_bodies_fail() {
        assert!(matches!(
            parse_product(r#"{"status": 0, "status_verbose": "product not found"}"#),
            Err(LookupError::NotFound)
        ));
        assert!(matches!(
            parse_product(r#"{"status": 1}"#),
            Err(LookupError::NotFound)
        ));
        assert!(matches!(
            parse_product(r#"{"product": {"brands": "Acme"}}"#),
            Err(LookupError::Malformed(_))
        ));
        assert!(matches!(
            parse_product(r#"{"product": "nope"}"#),
            Err(LookupError::Malformed(_))
        ));
        assert!(matches!(
            parse_product("<html>"),
            Err(LookupError::Malformed(_))
        ));
    }

    #[test]
    fn product_url_escapes_barcode() {
        let client = OpenFoodFactsClient::new(&LookupSettings::default()).unwrap();
        assert_eq!(
            client.product_url("012345").unwrap().as_str(),
            "https://world.openfoodfacts.net/api/v2/product/012345.json"
        );
        assert_eq!(
            client.product_url("a/b").unwrap().as_str(),
            "https://world.openfoodfacts.net/api/v2/product/a%2Fb.json"
        );
    }

    #[test]
    fn base_url_with_path_prefix() {
        let settings = LookupSettings {
            base_url: "http://localhost:8080/off/".into(),
            ..Default::default()
        };
        let client = OpenFoodFactsClient::new(&settings).unwrap();
        assert_eq!(
            client.product_url("1").unwrap().as_str(),
            "http://localhost:8080/off/api/v2/product/1.json"
        );
    }

    mod http {
        use super::*;
        use tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::TcpListener,
            sync::oneshot,
        };

        /// Answers one request with a canned response and hands back the raw
        /// request head.
        async fn serve_once(
            status_line: &'static str,
            body: &'static str,
        ) -> (String, oneshot::Receiver<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (head_tx, head_rx) = oneshot::channel();

            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }

                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
                let _ = head_tx.send(String::from_utf8_lossy(&head).into_owned());
            });

            (format!("http://{addr}"), head_rx)
        }

        fn client_for(base_url: String) -> OpenFoodFactsClient {
            OpenFoodFactsClient::new(&LookupSettings {
                base_url,
                timeout_secs: 5,
                ..Default::default()
            })
            .unwrap()
        }

        const TEST_BAR: &str = r#"{"status": 1, "product": {
            "product_name": "Test Bar",
            "nutriments": {"energy-kcal": 200, "proteins": 10}
        }}"#;

        #[tokio::test]
        async fn found_product_sends_agent_and_credentials() {
            let (base_url, head) = serve_once("200 OK", TEST_BAR).await;
            let client = client_for(base_url);

            let product = client.lookup("012345").await.unwrap();
            assert_eq!(product.name, "Test Bar");
            assert_eq!(product.calories, Some(200.0));
            assert_eq!(product.protein_g, Some(10.0));

            let head = head.await.unwrap().to_ascii_lowercase();
            assert!(
                head.starts_with("get /api/v2/product/012345.json http/1.1"),
                "{head}"
            );
            assert!(head.contains("user-agent: gramscaleapp/0.1"), "{head}");
            // "off:off"
            assert!(head.contains("authorization: basic b2zmom9mzg=="), "{head}");
            assert!(head.contains("accept: application/json"), "{head}");
        }

        #[tokio::test]
        async fn http_404_is_not_found() {
            let (base_url, _head) = serve_once("404 Not Found", "{}").await;
            let err = client_for(base_url).lookup("000").await.unwrap_err();
            assert!(matches!(err, LookupError::NotFound), "{err}");
        }

        #[tokio::test]
        async fn other_error_status_is_reported_with_code() {
            let (base_url, _head) = serve_once("500 Internal Server Error", "oops").await;
            let err = client_for(base_url).lookup("012345").await.unwrap_err();
            assert!(matches!(err, LookupError::Status(500)), "{err}");
        }

        #[tokio::test]
        async fn non_json_success_body_is_malformed() {
            let (base_url, _head) = serve_once("200 OK", "<html>maintenance</html>").await;
            let err = client_for(base_url).lookup("012345").await.unwrap_err();
            assert!(matches!(err, LookupError::Malformed(_)), "{err}");
        }

        #[tokio::test]
        async fn missing_username_sends_no_authorization() {
            let (base_url, head) = serve_once("200 OK", TEST_BAR).await;
            let client = OpenFoodFactsClient::new(&LookupSettings {
                base_url,
                username: None,
                password: None,
                ..Default::default()
            })
            .unwrap();

            client.lookup("012345").await.unwrap();
            let head = head.await.unwrap().to_ascii_lowercase();
            assert!(!head.contains("authorization:"), "{head}");
        }
    }
}
