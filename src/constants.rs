/// Page carrying the province `<select>`; its option values are the region set.
pub const CATALOG_URL: &str = "https://www.phlpost.gov.ph/post-office-location.php";

/// Endpoint answering a region form post with the facility table fragment.
pub const LISTING_URL: &str = "https://www.phlpost.gov.ph/post-office-location-result.php";

/// Form field name carrying the region in the listing request.
pub const REGION_FIELD: &str = "province";

/// Header cell that marks the facility table in a listing fragment.
pub const FACILITY_HEADER_LABEL: &str = "Post Office";

/// Extension used for cached listing documents.
pub const CACHE_EXTENSION: &str = "html";
