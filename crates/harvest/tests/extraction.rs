// ABOUTME: Integration tests for listing page extraction against an HTML fixture.
// ABOUTME: Checks container choice, field cascades, normalization, rejection and next-page detection.

use catalog_harvest::{CatalogSource, Crawler, PageExtractor, PriceFormat, SelectorSet};
use catalog_harvest::source::ListingPage;
use pretty_assertions::assert_eq;

const LISTING: &str = include_str!("fixtures/html/listing_page.html");

fn nimba() -> CatalogSource {
    CatalogSource::new(3, "Casa Nimba", "https://www.nimba.com.ar/")
}

#[test]
fn extracts_fixture_listing() {
    let source = nimba();
    let selectors = SelectorSet::default();
    let page = ListingPage::new(&source, 1);
    let out = PageExtractor::new(&selectors, "ARS", PriceFormat::default()).extract(&page, LISTING);

    assert_eq!(out.container.as_deref(), Some(".js-item-product"));
    assert_eq!(out.elements_found, 4);
    assert_eq!(out.rejected, 1);
    assert!(out.has_next_page);

    let names: Vec<&str> = out.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Mesa Ratona Paraíso", "Puff Tejido", "Almohadón Lino Crudo"]);

    let mesa = &out.products[0];
    assert_eq!(mesa.price, 189900.0);
    assert_eq!(mesa.external_id, "mesa-ratona-paraiso");
    assert_eq!(
        mesa.image_url.as_deref(),
        Some("https://d2r9epyceweg5n.cloudfront.net/stores/mesa-ratona.webp")
    );
    assert_eq!(mesa.category.as_deref(), Some("Living"));
    assert!(mesa.in_stock);

    let puff = &out.products[1];
    assert_eq!(puff.price, 45500.0);
    assert_eq!(puff.external_id, "4471");
    assert_eq!(puff.url.as_deref(), Some("https://www.nimba.com.ar/products/4471"));
    assert_eq!(
        puff.image_url.as_deref(),
        Some("https://www.nimba.com.ar/cdn/stores/puff.webp")
    );
    assert!(!puff.in_stock);
    assert_eq!(puff.category, None);

    let almohadon = &out.products[2];
    assert_eq!(almohadon.price, 12300.5);
    assert_eq!(almohadon.url, None);
    assert_eq!(almohadon.external_id, "almohadnlinocrudo_12300.5");
}

#[test]
fn crawler_extracts_with_overridden_selectors() {
    let selectors: SelectorSet = serde_json::from_str(
        r#"{
            "containers": [".ficha"],
            "name": [".nombre", ".titulo"],
            "price": [".precio"]
        }"#,
    )
    .unwrap();
    let crawler = Crawler::builder().selectors(selectors).build();
    let html = r#"
        <div class="ficha"><h4 class="titulo">Banqueta Alta</h4><p class="precio">$ 54.000</p></div>
        <div class="ficha"><h4 class="titulo">Banqueta Baja</h4><p class="precio">$ 49.000</p></div>
    "#;
    let out = crawler.extract_page(&nimba(), 1, html);

    assert_eq!(out.products.len(), 2);
    assert_eq!(out.products[0].name, "Banqueta Alta");
    assert_eq!(out.products[1].price, 49000.0);
    assert!(!out.has_next_page);
}
