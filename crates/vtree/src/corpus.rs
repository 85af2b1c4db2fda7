//! Shared old/new tree pairs for differ and committer tests.

use crate::types::{Child, FunctionRef, Node, Tag};

pub const INGREDIENTS: [&str; 6] = [
    "1 lb Salmon",
    "1 cup Pine Nuts",
    "2 cups Butter Lettuce",
    "1 Yellow Squash",
    "1/2 cup Olive Oil",
    "3 cloves of Garlic",
];

#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub old: Option<Node>,
    pub new: Option<Node>,
}

impl Scenario {
    fn new(name: &'static str, old: Option<Node>, new: Option<Node>) -> Self {
        Self { name, old, new }
    }
}

/// `ul` of plain `li` items, matched by position.
pub fn ingredient_list() -> Node {
    list(&INGREDIENTS, false)
}

/// `ul.ingredients` of `li` items keyed by their index in [`INGREDIENTS`].
pub fn keyed_ingredient_list() -> Node {
    list(&INGREDIENTS, true)
}

fn list(items: &[&str], keyed: bool) -> Node {
    Node::element("ul")
        .attr("class", "ingredients")
        .children(items.iter().map(|item| {
            let li = Node::element("li");
            let li = match INGREDIENTS.iter().position(|known| known == item) {
                Some(index) if keyed => li.key(index.to_string()),
                _ => li,
            };
            li.text(*item)
        }))
        .build()
}

fn keyed(order: &[usize]) -> Node {
    let items: Vec<&str> = order.iter().map(|&i| INGREDIENTS[i]).collect();
    list(&items, true)
}

fn unkeyed(order: &[usize]) -> Node {
    let items: Vec<&str> = order.iter().map(|&i| INGREDIENTS[i]).collect();
    list(&items, false)
}

/// Recipe card: title, optional servings counter, ingredient list and steps.
pub fn recipe(title: &str, servings: Option<i32>, ingredients: Node, steps: &[&str]) -> Node {
    let mut card = Node::element("section")
        .attr("id", "recipe-0")
        .attr("data-type", "recipe")
        .child(
            Node::element("h1")
                .attr("data-type", "title")
                .text(title),
        );
    if let Some(servings) = servings {
        card = card.child(
            Node::element("p")
                .attr("class", "servings")
                .text("Serves ")
                .text(servings),
        );
    }
    card.child(ingredients)
        .child(
            Node::element("ol")
                .attr("class", "instructions")
                .children(steps.iter().map(|step| Node::element("li").text(*step))),
        )
        .child(
            Node::element("button")
                .attr("onclick", FunctionRef::new("share_recipe"))
                .text("Share"),
        )
        .build()
}

fn keyed_rows(rows: &[(&str, &str)]) -> Node {
    Node::element("table")
        .children(rows.iter().map(|(key, value)| {
            Node::element("tr")
                .key(*key)
                .child(Node::element("td").text(*key))
                .child(Node::element("td").text(*value))
        }))
        .build()
}

pub fn scenarios() -> Vec<Scenario> {
    let steps = ["Preheat the oven", "Season the salmon", "Bake 15 minutes"];
    vec![
        Scenario::new("mount", None, Some(ingredient_list())),
        Scenario::new("unmount", Some(ingredient_list()), None),
        Scenario::new(
            "unchanged",
            Some(keyed_ingredient_list()),
            Some(keyed_ingredient_list()),
        ),
        Scenario::new(
            "attribute-update",
            Some(ingredient_list()),
            Some(
                Node::element("ul")
                    .attr("class", "ingredients compact")
                    .attr("data-count", 6)
                    .children(
                        INGREDIENTS
                            .iter()
                            .map(|item| Node::element("li").text(*item)),
                    )
                    .build(),
            ),
        ),
        Scenario::new(
            "keyed-swap",
            Some(keyed(&[0, 1])),
            Some(keyed(&[1, 0])),
        ),
        Scenario::new(
            "keyed-reverse",
            Some(keyed(&[0, 1, 2, 3, 4, 5])),
            Some(keyed(&[5, 4, 3, 2, 1, 0])),
        ),
        Scenario::new(
            "keyed-insert-middle",
            Some(keyed(&[0, 1, 4, 5])),
            Some(keyed(&[0, 1, 2, 3, 4, 5])),
        ),
        Scenario::new(
            "keyed-remove-and-shuffle",
            Some(keyed(&[0, 1, 2, 3, 4, 5])),
            Some(keyed(&[3, 0, 5, 2])),
        ),
        Scenario::new(
            "keyed-replace-all",
            Some(keyed(&[0, 1, 2])),
            Some(keyed(&[3, 4, 5])),
        ),
        Scenario::new(
            "unkeyed-prepend",
            Some(unkeyed(&[0, 1])),
            Some(unkeyed(&[2, 0, 1])),
        ),
        Scenario::new(
            "unkeyed-shrink",
            Some(unkeyed(&[0, 1, 2, 3])),
            Some(unkeyed(&[0, 1])),
        ),
        Scenario::new(
            "keyed-to-unkeyed",
            Some(keyed(&[0, 1, 2])),
            Some(unkeyed(&[2, 1, 0])),
        ),
        Scenario::new(
            "root-tag-change",
            Some(ingredient_list()),
            Some(
                Node::element("ol")
                    .children(INGREDIENTS.iter().map(|item| Node::element("li").text(*item)))
                    .build(),
            ),
        ),
        Scenario::new(
            "component-tag",
            Some(
                Node::element("main")
                    .child(Node::element(Tag::component("IngredientsList")))
                    .build(),
            ),
            Some(
                Node::element("main")
                    .child(Node::element(Tag::host("IngredientsList")))
                    .build(),
            ),
        ),
        Scenario::new(
            "recipe-edit",
            Some(recipe(
                "Baked Salmon",
                Some(2),
                keyed(&[0, 1, 2, 3, 4, 5]),
                &steps,
            )),
            Some(recipe(
                "Baked Salmon with Garlic",
                Some(4),
                keyed(&[5, 0, 1, 2, 3]),
                &steps[..2],
            )),
        ),
        Scenario::new(
            "recipe-drop-servings",
            Some(recipe("Fish Tacos", Some(3), unkeyed(&[0, 2]), &steps)),
            Some(recipe("Fish Tacos", None, unkeyed(&[0, 2]), &steps)),
        ),
        Scenario::new(
            "text-to-element",
            Some(Node::element("p").text("Bake").build()),
            Some(
                Node::element("p")
                    .child(Child::Element(Node::element("strong").text("Bake").build()))
                    .text(" at 350")
                    .build(),
            ),
        ),
        Scenario::new(
            "keyed-rows-with-content",
            Some(keyed_rows(&[
                ("salmon", "1 lb"),
                ("nuts", "1 cup"),
                ("lettuce", "2 cups"),
                ("squash", "1"),
            ])),
            Some(keyed_rows(&[
                ("squash", "2"),
                ("salmon", "1.5 lb"),
                ("lettuce", "2 cups"),
                ("oil", "1/2 cup"),
                ("nuts", "1 cup"),
            ])),
        ),
    ]
}
