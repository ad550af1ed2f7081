use tiny_vdom_testing::prelude::*;

#[test]
fn style_objects_diff_per_property() {
    run_test_root(|root| {
        root.set_content(h!(
            "div",
            attrs! { "style" => style! { "width" => 10, "opacity" => 0.5, "--gap" => "4px" } }
        ))
        .expect("mount");
        let div = root.find("div").expect("div");
        assert_eq!(
            root.attribute(div, "style").as_deref(),
            Some("width: 10px; opacity: 0.5; --gap: 4px;")
        );
        root.reset_counters();

        root.render(h!(
            "div",
            attrs! { "style" => style! { "width" => 12, "opacity" => 0.5 } }
        ))
        .expect("render");

        assert_eq!(root.mutations(), 2);
        assert_eq!(
            root.attribute(div, "style").as_deref(),
            Some("width: 12px; opacity: 0.5;")
        );
    });
}

#[test]
fn boolean_and_null_attributes() {
    run_test_root(|root| {
        root.set_content(h!(
            "input",
            attrs! { "type" => "checkbox", "checked" => true, "aria-label" => "pick", "data-x" => AttrValue::Null }
        ))
        .expect("mount");
        let input = root.find("input").expect("input");
        assert_eq!(root.attribute(input, "checked").as_deref(), Some(""));
        assert_eq!(root.attribute(input, "aria-label").as_deref(), Some("pick"));
        assert_eq!(root.attribute(input, "data-x"), None);

        root.render(h!(
            "input",
            attrs! { "type" => "checkbox", "checked" => false }
        ))
        .expect("render");
        assert_eq!(root.attribute(input, "checked"), None);
        assert_eq!(root.attribute(input, "aria-label"), None);
    });
}

#[test]
fn listeners_are_swapped_not_stacked() {
    run_test_root(|root| {
        let clicks = std::rc::Rc::new(std::cell::Cell::new(0));
        for step in 0..3 {
            let clicks = clicks.clone();
            root.render(h!(
                "button",
                attrs! { "onClick" => AttrValue::listener(move |_| clicks.set(clicks.get() + step)) }
            ))
            .expect("render");
        }
        let button = root.find("button").expect("button");
        assert_eq!(root.document().borrow().listener_count(button, "click"), 1);
        assert_eq!(root.click(button), 1);
        assert_eq!(clicks.get(), 2);
    });
}

#[test]
fn inner_html_replaces_children() {
    run_test_root(|root| {
        root.set_content(h!(
            "div",
            attrs! { "dangerouslySetInnerHTML" => AttrValue::html("<b>raw</b>") }
        ))
        .expect("mount");
        assert_eq!(root.html(), "<div><b>raw</b></div>");
    });
}
