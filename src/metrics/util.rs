use prometheus::core::Desc;
use prometheus::proto::{LabelPair, MetricFamily, MetricType};

pub fn into_labels(kv: &[(&str, &str)]) -> Vec<LabelPair> {
    kv.iter()
        .copied()
        .map(|(k, v)| {
            let mut lp = LabelPair::default();
            lp.set_name(k.to_owned());
            lp.set_value(v.to_owned());
            lp
        })
        .collect()
}

pub fn gauge(desc: &Desc, label_values: Vec<LabelPair>, value: f64) -> MetricFamily {
    let mut mf = MetricFamily::default();
    mf.set_name(desc.fq_name.clone());
    mf.set_help(desc.help.clone());
    mf.set_field_type(MetricType::GAUGE);

    let mut m = prometheus::proto::Metric::default();
    m.set_label(label_values);

    let mut g = prometheus::proto::Gauge::default();
    g.set_value(value);
    m.set_gauge(g);

    mf.set_metric(vec![m]);
    mf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_gauge_family() {
        let desc = Desc::new(
            "test_gauge".into(),
            "A gauge for testing".into(),
            vec!["sensor".to_owned()],
            HashMap::new(),
        )
        .unwrap();

        let mf = gauge(&desc, into_labels(&[("sensor", "1")]), 21.5);
        assert_eq!(mf.get_name(), "test_gauge");
        assert_eq!(mf.get_help(), "A gauge for testing");
        assert_eq!(mf.get_field_type(), MetricType::GAUGE);
        assert_eq!(mf.get_metric().len(), 1);

        let m = &mf.get_metric()[0];
        assert_eq!(m.get_label()[0].get_name(), "sensor");
        assert_eq!(m.get_label()[0].get_value(), "1");
        assert_eq!(m.get_gauge().value(), 21.5);
    }
}
