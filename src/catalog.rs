//! Merchandise and promo codes sold through the site.

use crate::models::{Coupon, DiscountType, Product, ProductVariant};

pub fn coupons() -> Vec<Coupon> {
    vec![
        Coupon {
            code: "VNVNC2025".to_string(),
            discount_type: DiscountType::Percent,
            value: 10,
            min_amount: None,
        },
        Coupon {
            code: "FRIENDS".to_string(),
            discount_type: DiscountType::Fixed,
            value: 500,
            min_amount: Some(3000),
        },
    ]
}

fn variant(id: &str, name: &str, price: i64) -> ProductVariant {
    ProductVariant {
        id: id.to_string(),
        name: name.to_string(),
        price,
        in_stock: true,
    }
}

fn images(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| format!("/merch/{name}")).collect()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

const COTTON: &str = "материал: хлопок 100% (cotton 100%). лимитированная коллекция 2025.";

pub fn products() -> Vec<Product> {
    vec![
        Product {
            id: "hoodie-red-2025".to_string(),
            name: "худи red (hoodie red)".to_string(),
            description: COTTON.to_string(),
            images: images(&[
                "VNVNC-15.webp",
                "VNVNC-16.webp",
                "VNVNC-17.webp",
                "VNVNC-18.webp",
                "VNVNC-36.webp",
                "VNVNC-37.webp",
            ]),
            variants: vec![variant("hr-m", "M", 5000), variant("hr-l", "L", 5000)],
            tags: tags(&["clothes", "new"]),
        },
        Product {
            id: "hoodie-blue-2025".to_string(),
            name: "худи blue (hoodie blue)".to_string(),
            description: COTTON.to_string(),
            images: images(&["VNVNC-19.webp", "VNVNC-20.webp", "VNVNC-21.webp"]),
            variants: vec![variant("hb-m", "M", 5000), variant("hb-l", "L", 5000)],
            tags: tags(&["clothes", "new"]),
        },
        Product {
            id: "t-shirt-blue-2025".to_string(),
            name: "футболка blue (t-shirt blue)".to_string(),
            description: COTTON.to_string(),
            images: images(&["VNVNC-1.jpg", "VNVNC-2.webp", "VNVNC-4.webp"]),
            variants: vec![variant("tsb-m", "M", 2500), variant("tsb-l", "L", 2500)],
            tags: tags(&["clothes"]),
        },
        Product {
            id: "t-shirt-pink-2025".to_string(),
            name: "футболка pink (t-shirt pink)".to_string(),
            description: COTTON.to_string(),
            images: images(&["VNVNC-7.webp", "VNVNC-8.webp", "VNVNC-10.webp"]),
            variants: vec![variant("tsp-m", "M", 2500), variant("tsp-l", "L", 2500)],
            tags: tags(&["clothes", "new"]),
        },
        Product {
            id: "gloves-2025".to_string(),
            name: "перчатки (gloves)".to_string(),
            description: "материал: хлопок 100% (cotton 100%).".to_string(),
            images: images(&["VNVNC-24.webp", "VNVNC-25.webp"]),
            variants: vec![variant("gloves-one", "One Size", 500)],
            tags: tags(&["accessories"]),
        },
        Product {
            id: "pendant-2025".to_string(),
            name: "подвеска (jewelry pendant)".to_string(),
            description: "материал: нержавеющая сталь (stainless steel).".to_string(),
            images: images(&["VNVNC-49.webp", "VNVNC-50.webp", "VNVNC-57.jpg"]),
            variants: vec![variant("pendant-one", "One Size", 1500)],
            tags: tags(&["accessories"]),
        },
        Product {
            id: "sticker-pack-2025".to_string(),
            name: "стикер‑пак (sticker pack)".to_string(),
            description: "набор наклеек с фирменной айдентикой vnvnc.".to_string(),
            images: images(&["VNVNC-88.jpg"]),
            variants: vec![variant("stickers-one", "One Size", 200)],
            tags: tags(&["accessories"]),
        },
    ]
}

pub fn find_product(id: &str) -> Option<Product> {
    products().into_iter().find(|p| p.id == id)
}

pub fn tag_label(tag: &str) -> &str {
    match tag {
        "clothes" => "одежда",
        "accessories" => "аксессуары",
        "underwear" => "белье",
        "new" => "новинка",
        "bestseller" => "хит",
        "limited" => "лимитед",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_ids_and_variant_ids_are_unique() {
        let products = products();
        let mut product_ids: Vec<_> = products.iter().map(|p| p.id.as_str()).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        assert_eq!(product_ids.len(), products.len());

        let mut variant_ids: Vec<_> = products
            .iter()
            .flat_map(|p| p.variants.iter().map(|v| v.id.as_str()))
            .collect();
        let total = variant_ids.len();
        variant_ids.sort_unstable();
        variant_ids.dedup();
        assert_eq!(variant_ids.len(), total);
    }

    #[test]
    fn finds_products_and_labels_tags() {
        let gloves = find_product("gloves-2025").expect("gloves listed");
        assert_eq!(gloves.variant("gloves-one").map(|v| v.price), Some(500));
        assert_eq!(tag_label("new"), "новинка");
        assert_eq!(tag_label("vinyl"), "vinyl");
    }
}
