use crate::api::PageSource;
use crate::error::{Error, Result};
use crate::schema::common::{parse_listing_date, parse_price};
use async_trait::async_trait;
use chrono::NaiveDate;
use econdb_util::{build_client, classify, StatusClass, Util, BROWSER_USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// i3investor stock pages: https://klse.i3investor.com
//
////////////////////////////////////////////////////////////////////////////////////////////////////

const TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches pages with a browser-like `User-Agent`; anything but a 200 fails the call.
pub struct PageClient {
    http: Client,
}

impl PageClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: build_client(Some(BROWSER_USER_AGENT), TIMEOUT)?,
        })
    }
}

#[async_trait]
impl PageSource for PageClient {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let (status, body) = self.http.fetch_text(url).await?;
        match classify(status) {
            StatusClass::Ok => Ok(body),
            _ => Err(Error::Status {
                status,
                url: url.to_string(),
            }),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Extraction

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| Error::Selector(css))
}

/// Text of an element with whitespace runs collapsed.
fn squash<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_hidden(element: &scraper::node::Element) -> bool {
    element.classes().any(|class| class == "d-none") || element.attr("hidden").is_some()
}

/// Text a reader would see: text nodes under a hidden descendant are skipped.
fn visible_text(element: ElementRef) -> String {
    let root = element.id();
    let visible = element.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(is_hidden);
        (!hidden).then_some(&**text)
    });
    squash(visible)
}

/// The "Last Price" figure of a price page.
///
/// Among the `div.col-md-3.col-6` stat boxes, the one whose first paragraph mentions
/// `Last Price` holds the value in its first `p > strong`.
pub fn extract_last_price(html: &str) -> Result<f64> {
    let document = Html::parse_document(html);
    let boxes = selector("div.col-md-3.col-6")?;
    let paragraph = selector("p")?;
    let value = selector("p > strong")?;

    let raw = document
        .select(&boxes)
        .filter(|stat| {
            stat.select(&paragraph)
                .next()
                .is_some_and(|label| squash(label.text()).contains("Last Price"))
        })
        .find_map(|stat| stat.select(&value).next())
        .map(|strong| squash(strong.text()))
        .filter(|text| !text.is_empty())
        .ok_or(Error::FieldNotFound("Last Price"))?;

    debug!("found raw price '{raw}'");
    parse_price(&raw)
}

/// Fields scraped from a profile page; the company name is the only required one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedProfile {
    pub company_name: String,
    pub country_code: Option<String>,
    pub sector: Option<String>,
    pub subsector: Option<String>,
    pub listing_date: Option<NaiveDate>,
}

fn company_name(document: &Html) -> Result<Option<String>> {
    let heading = selector("h5#stock-heading a strong")?;
    if let Some(name) = document
        .select(&heading)
        .map(|strong| squash(strong.text()))
        .find(|name| !name.is_empty())
    {
        return Ok(Some(name));
    }

    // fallback: <h5>Profile</h5><h6><strong>NAME</strong></h6>
    let h5 = selector("h5")?;
    let strong = selector("strong")?;
    let name = document
        .select(&h5)
        .find(|h5| squash(h5.text()) == "Profile")
        .and_then(|h5| h5.next_siblings().find_map(ElementRef::wrap))
        .filter(|sibling| sibling.value().name() == "h6")
        .and_then(|h6| h6.select(&strong).next())
        .map(|strong| squash(strong.text()))
        .filter(|name| !name.is_empty());
    Ok(name)
}

fn after_label(text: &str, label: &str) -> Option<String> {
    let value = text.strip_prefix(label)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Company name plus the labeled paragraphs of `div#profile-info`.
pub fn extract_profile(html: &str) -> Result<ScrapedProfile> {
    let document = Html::parse_document(html);
    let company_name = company_name(&document)?.ok_or(Error::FieldNotFound("company name"))?;
    let mut profile = ScrapedProfile {
        company_name,
        ..Default::default()
    };

    let info = selector("div#profile-info")?;
    let paragraph = selector("p")?;
    let Some(info) = document.select(&info).next() else {
        warn!("no profile-info section for {}", profile.company_name);
        return Ok(profile);
    };

    for p in info.select(&paragraph) {
        let text = visible_text(p);
        if let Some(value) = after_label(&text, "Country Code:") {
            profile.country_code = Some(value);
        } else if let Some(value) = after_label(&text, "Sector:") {
            profile.sector = Some(value);
        } else if let Some(value) = after_label(&text, "Subsector:") {
            profile.subsector = Some(value);
        } else if let Some(value) = after_label(&text, "Listing Date:") {
            match parse_listing_date(&value) {
                Ok(date) => profile.listing_date = Some(date),
                Err(e) => warn!("{}: {e}", profile.company_name),
            }
        }
    }

    for (label, missing) in [
        ("country code", profile.country_code.is_none()),
        ("sector", profile.sector.is_none()),
        ("subsector", profile.subsector.is_none()),
    ] {
        if missing {
            warn!("{label} not found for {}", profile.company_name);
        }
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_PAGE: &str = r#"
        <html><body>
          <div class="row">
            <div class="col-md-3 col-6"><p>Open</p><p><strong>9.60</strong></p></div>
            <div class="col-md-3 col-6">
              <p class="mb-0">Last Price</p>
              <p><strong> 1,009.72 </strong> <span>+0.12</span></p>
            </div>
          </div>
        </body></html>
    "#;

    const PROFILE_PAGE: &str = r##"
        <html><body>
          <h5 class="mb-0" id="stock-heading"><a href="#"><strong>MALAYAN BANKING BERHAD</strong></a></h5>
          <div class="row" id="profile-info">
            <p>Country Code: <a href="#" class="d-none">MY</a> MY</p>
            <p>Sector: FINANCIAL SERVICES</p>
            <p>Subsector: BANKING</p>
            <p>Listing Date: 17 Feb 1960</p>
          </div>
        </body></html>
    "##;

    #[test]
    fn price_comes_from_the_last_price_box() {
        assert_eq!(extract_last_price(PRICE_PAGE).unwrap(), 1009.72);
    }

    #[test]
    fn page_without_price_box_is_field_not_found() {
        let err = extract_last_price("<html><body><p>Last Price</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::FieldNotFound("Last Price")));
        assert!(err.is_not_found());
    }

    #[test]
    fn non_numeric_price_is_a_parse_error() {
        let html = r#"<div class="col-md-3 col-6"><p>Last Price</p><p><strong>-</strong></p></div>"#;
        assert!(matches!(
            extract_last_price(html).unwrap_err(),
            Error::Parse { what: "price", .. }
        ));
    }

    #[test]
    fn profile_fields_use_visible_text_only() {
        let profile = extract_profile(PROFILE_PAGE).unwrap();
        assert_eq!(profile.company_name, "MALAYAN BANKING BERHAD");
        assert_eq!(profile.country_code.as_deref(), Some("MY"));
        assert_eq!(profile.sector.as_deref(), Some("FINANCIAL SERVICES"));
        assert_eq!(profile.subsector.as_deref(), Some("BANKING"));
        assert_eq!(profile.listing_date, NaiveDate::from_ymd_opt(1960, 2, 17));
    }

    #[test]
    fn company_name_falls_back_to_profile_heading() {
        let html = r#"
            <h5>Profile</h5>
            <h6><strong>PUBLIC BANK BHD</strong></h6>
            <div id="profile-info"><p>Sector: FINANCIAL SERVICES</p></div>
        "#;
        let profile = extract_profile(html).unwrap();
        assert_eq!(profile.company_name, "PUBLIC BANK BHD");
        assert_eq!(profile.sector.as_deref(), Some("FINANCIAL SERVICES"));
        assert_eq!(profile.subsector, None);
        assert_eq!(profile.country_code, None);
    }

    #[test]
    fn missing_company_name_is_field_not_found() {
        let html = r#"<div id="profile-info"><p>Sector: ENERGY</p></div>"#;
        assert!(matches!(
            extract_profile(html).unwrap_err(),
            Error::FieldNotFound("company name")
        ));
    }

    #[test]
    fn unreadable_listing_date_is_skipped() {
        let html = r#"
            <h5 id="stock-heading"><a><strong>X BHD</strong></a></h5>
            <div id="profile-info"><p>Listing Date: soon</p></div>
        "#;
        assert_eq!(extract_profile(html).unwrap().listing_date, None);
    }
}
