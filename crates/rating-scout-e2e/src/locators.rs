//! XPath locators for the shopping search page.
//!
//! Each group lists Spanish and English variants of the same control; the
//! first one that matches wins.

/// Signs that a CAPTCHA interstitial is showing.
pub const CAPTCHA_MARKERS: &[&str] = &[
    "//iframe[contains(@src,'recaptcha')]",
    "//*[contains(.,'I am not a robot') or contains(.,'No soy un robot')]",
    "//*[contains(.,'verify') and contains(.,'human')]",
];

/// Result containers or product links; either means the grid rendered.
pub const RESULTS_READY: &[&str] = &[
    "//div[@id='search']//div[@data-hveid or @data-docid or @data-id] | //a[contains(@href,'/shopping/product/')]",
];

pub const SORT_BUTTONS: &[&str] = &[
    "//button[@aria-label='Ordenar por']",
    "//button[@aria-label='Sort by']",
    "//span[normalize-space()='Ordenar por']/ancestor::button",
    "//span[normalize-space()='Sort by']/ancestor::button",
];

pub const SORT_HIGH_TO_LOW: &[&str] = &[
    "//div[@role='menu']//span[normalize-space()='Precio: de mayor a menor']",
    "//div[@role='menu']//span[normalize-space()='Price: High to Low']",
];

pub const MAX_PRICE_INPUT: &str = "//input[@aria-label and (contains(@aria-label,'Precio máximo') or contains(@aria-label,'Maximum price'))]";

/// The "4 stars and up" filter chip.
pub const MIN_RATING_CHIP: &[&str] = &[
    "//a[contains(@aria-label,'4 estrellas') or contains(@aria-label,'4 stars')]",
    "//span[contains(text(),'4 estrellas') or contains(text(),'4 stars')]/ancestor::a",
];
