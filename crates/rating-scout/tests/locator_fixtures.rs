//! Rating and product-link locators evaluated against small pages.

use rating_scout::{parse_rating_text, selectors};
use sxd_document::parser;
use sxd_xpath::{evaluate_xpath, Value};

/// String values of every node `xpath` selects in `markup`.
fn select(markup: &str, xpath: &str) -> Vec<String> {
    let package = parser::parse(markup).expect("fixture is well-formed");
    let document = package.as_document();
    match evaluate_xpath(&document, xpath).expect("locator evaluates") {
        Value::Nodeset(nodes) => nodes
            .document_order()
            .iter()
            .map(|node| node.string_value())
            .collect(),
        _ => panic!("{xpath} did not select nodes"),
    }
}

fn page(body: &str) -> String {
    format!("<html><head><title>Product</title></head><body>{body}</body></html>")
}

fn first_rating(values: &[String]) -> Option<f64> {
    values
        .iter()
        .find_map(|v| parse_rating_text(v.trim()))
        .map(|r| r.value())
}

#[test]
fn test_meta_tags() {
    let markup = r#"<html><head><meta itemprop="ratingValue" content="4.6"/><meta property="og:rating" content="4,2"/></head><body/></html>"#;

    let itemprop = format!("({})/@content", selectors::RATING_META[0]);
    assert_eq!(select(markup, &itemprop), vec!["4.6"]);
    let og = format!("({})/@content", selectors::RATING_META[1]);
    assert_eq!(first_rating(&select(markup, &og)), Some(4.2));
}

#[test]
fn test_label_only_role_img_widget() {
    let markup = page(r#"<div role="img" aria-label="Rated 4.3 out of 5 stars"></div>"#);

    let labels = format!("({})/@aria-label", selectors::RATING_WIDGETS[2]);
    assert_eq!(select(&markup, &labels), vec!["Rated 4.3 out of 5 stars"]);
    assert_eq!(first_rating(&select(&markup, &labels)), Some(4.3));
}

#[test]
fn test_label_only_span_and_div_widgets() {
    let markup = page(
        r#"<span aria-label="4.5 out of 5 stars"></span><div aria-label="4,0 de 5 estrellas"></div>"#,
    );

    let span = format!("({})/@aria-label", selectors::RATING_WIDGETS[0]);
    assert_eq!(first_rating(&select(&markup, &span)), Some(4.5));
    let div = format!("({})/@aria-label", selectors::RATING_WIDGETS[1]);
    assert_eq!(first_rating(&select(&markup, &div)), Some(4.0));
}

#[test]
fn test_text_labelled_widget() {
    let markup = page(r#"<span aria-label="Calificación">4,5 de 5 estrellas</span>"#);
    assert_eq!(
        first_rating(&select(&markup, selectors::RATING_WIDGETS[0])),
        Some(4.5)
    );
}

#[test]
fn test_widgets_ignore_unrelated_labels() {
    let markup = page(r#"<span aria-label="Add to cart">Buy</span><div role="img" aria-label="Book cover"></div>"#);
    for locator in &selectors::RATING_WIDGETS[..3] {
        assert!(select(&markup, locator).is_empty(), "{locator} matched");
    }
}

#[test]
fn test_class_widgets() {
    let markup = page(r#"<span class="z3HNkc Rsc7Yb" aria-label="Rated 4.7 out of 5"></span>"#);
    let labels = format!("({})/@aria-label", selectors::RATING_WIDGETS[3]);
    assert_eq!(first_rating(&select(&markup, &labels)), Some(4.7));
}

#[test]
fn test_store_rating_under_seller_heading() {
    let markup = page(r#"<div><h3>Seller</h3><span>4.8 out of 5</span></div>"#);
    let found = select(&markup, selectors::STORE_RATINGS[1]);
    assert!(found.iter().any(|t| t == "4.8 out of 5"));
    assert_eq!(first_rating(&found), Some(4.8));

    let orphan = page(r#"<div><span>4.8 out of 5</span></div>"#);
    assert!(select(&orphan, selectors::STORE_RATINGS[1]).is_empty());
}

#[test]
fn test_store_rating_text() {
    let markup = page(r#"<div>Store rating: 4.5</div>"#);
    assert_eq!(
        first_rating(&select(&markup, selectors::STORE_RATINGS[0])),
        Some(4.5)
    );
}

#[test]
fn test_product_anchors() {
    let markup = page(
        r#"<a href="/shopping/product/123?q=x&amp;sa=X">Book</a><a href="/search?q=book">More</a>"#,
    );
    let hrefs = format!("({})/@href", selectors::PRODUCT_LINKS);
    assert_eq!(select(&markup, &hrefs), vec!["/shopping/product/123?q=x&sa=X"]);
}

#[test]
fn test_jsonld_scripts() {
    let markup = page(
        r#"<script type="application/ld+json">{"aggregateRating":{"ratingValue":"4.4"}}</script><script>var x = 1;</script>"#,
    );
    let blocks = select(&markup, selectors::JSONLD_SCRIPTS);
    assert_eq!(blocks.len(), 1);
    let rating = rating_scout::rating_from_blocks(blocks.iter().map(String::as_str));
    assert_eq!(rating.map(|r| r.value()), Some(4.4));
}
