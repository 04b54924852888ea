//! XPath locators for shopping result and product pages.
//!
//! Update these when the page markup changes; every heuristic that
//! depends on markup reads its locator from here.

/// JSON-LD script blocks.
pub const JSONLD_SCRIPTS: &str = "//script[@type='application/ld+json']";

/// Meta tags carrying a rating in their `content` attribute.
pub const RATING_META: &[&str] = &[
    "//meta[@itemprop='ratingValue']",
    "//meta[@property='og:rating' or @name='rating']",
];

/// Visible rating widgets, most specific first.
pub const RATING_WIDGETS: &[&str] = &[
    "//span[@aria-label and (contains(@aria-label,'out of 5') or contains(@aria-label,'de 5') or contains(@aria-label,'stars') or contains(@aria-label,'estrellas') or contains(.,'out of 5') or contains(.,'de 5') or contains(.,'stars') or contains(.,'estrellas'))]",
    "//div[@aria-label and (contains(@aria-label,'out of 5') or contains(@aria-label,'de 5') or contains(@aria-label,'stars') or contains(@aria-label,'estrellas') or contains(.,'out of 5') or contains(.,'de 5') or contains(.,'stars') or contains(.,'estrellas'))]",
    "//*[@role='img' and @aria-label and (contains(@aria-label,'star') or contains(@aria-label,'estrella') or contains(.,'star') or contains(.,'estrella'))]",
    "//span[contains(@class,'Rsc7Yb') and @aria-label]",
    "//span[contains(@class,'QIrs8') and @aria-label]",
    "//*[contains(translate(normalize-space(.),'RATING','rating'),'rating') and not(self::script)]",
];

/// Seller or store rating blocks on offer-listing pages.
pub const STORE_RATINGS: &[&str] = &[
    "//*[contains(translate(., 'STORE', 'store'),'store rating') or contains(translate(., 'SELLER', 'seller'),'seller rating') or contains(.,'Calificación de la tienda')]",
    "//*[contains(.,'out of 5') or contains(.,'de 5')][ancestor::*[contains(.,'Seller') or contains(.,'Store') or contains(.,'Tienda')]]",
];

/// Anchors pointing at product detail pages.
pub const PRODUCT_LINKS: &str = "//a[contains(@href,'/shopping/product/')]";

/// Path fragment identifying a product detail URL.
pub const PRODUCT_PATH_MARKER: &str = "/shopping/product/";

/// Query suffix appended to product links for click tracking.
pub const TRACKING_MARKER: &str = "&sa=";
