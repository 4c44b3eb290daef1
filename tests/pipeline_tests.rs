#[cfg(test)]
mod tests {
    use measurement_extractor::errors::AppError;
    use measurement_extractor::{MeasurementPipeline, MeasurementVocabulary};

    fn create_pipeline() -> MeasurementPipeline {
        MeasurementPipeline::new(MeasurementVocabulary::default()).unwrap()
    }

    #[test]
    fn test_end_to_end_weight() {
        let pipeline = create_pipeline();
        assert_eq!(pipeline.prepare("Weight: 5 kg approx"), "Weight 5 kilogram approx");
        assert_eq!(pipeline.normalize("Weight: 5 kg approx"), vec!["5 kilogram"]);
    }

    #[test]
    fn test_standardization_precedes_resolution() {
        let pipeline = create_pipeline();
        assert_eq!(
            pipeline.normalize("Rated 11 kv, 2 kw"),
            vec!["11 kilovolt", "2 kilowatt"]
        );
    }

    #[test]
    fn test_package_label() {
        let pipeline = create_pipeline();
        assert_eq!(
            pipeline.normalize("Net wt. 16 oz (1 lb) 453 g"),
            vec!["16 ounce", "1 pound", "453 gram"]
        );
    }

    #[test]
    fn test_volume_label() {
        let pipeline = create_pipeline();
        assert_eq!(pipeline.normalize("Contents: 2 fl oz"), vec!["2 fluid ounce"]);
    }

    #[test]
    fn test_glued_abbreviation_is_expanded() {
        let pipeline = create_pipeline();
        assert_eq!(
            pipeline.normalize("Width: 12.5 cm, Height 30cm"),
            vec!["12.5 centimetre", "30 centimetre"]
        );
    }

    #[test]
    fn test_glued_single_letter_units_keep_their_base_unit() {
        let pipeline = create_pipeline();
        let cases = [
            ("500g", "500 gram"),
            ("5m", "5 metre"),
            ("2l", "2 litre"),
            ("12V", "12 volt"),
            ("1500W", "1500 watt"),
            ("5kg approx", "5 kilogram"),
        ];
        for (text, expected) in cases {
            assert_eq!(pipeline.normalize(text), vec![expected], "{}", text);
        }
    }

    #[test]
    fn test_glued_letter_without_abbreviation_is_dropped() {
        let mut vocabulary = MeasurementVocabulary::default();
        vocabulary.abbreviations.clear();
        let pipeline = MeasurementPipeline::new(vocabulary).unwrap();
        assert!(pipeline.normalize("500g").is_empty());
    }

    #[test]
    fn test_kilo_plurals_keep_their_prefix() {
        let pipeline = create_pipeline();
        assert_eq!(pipeline.normalize("5 kilograms"), vec!["5 kilogram"]);
        assert_eq!(pipeline.normalize("5 kilowatts"), vec!["5 kilowatt"]);
        assert_eq!(pipeline.normalize("5 kilovolts"), vec!["5 kilovolt"]);
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let pipeline = create_pipeline();
        assert!(pipeline.normalize("").is_empty());
        assert!(pipeline.normalize("@@@ ### !!!").is_empty());
        assert!(pipeline.normalize("12 34 56").is_empty());
        assert!(pipeline.normalize("\u{FFFD}\u{0000}\u{200B}").is_empty());
    }

    #[test]
    fn test_output_is_deterministic() {
        let pipeline = create_pipeline();
        let text = "Width 12.5 cm Height 30 mm Weight 2.2 lb 1 kg";
        let first = pipeline.normalize(text);
        assert!(!first.is_empty());
        for _ in 0..5 {
            assert_eq!(pipeline.normalize(text), first);
        }
    }

    #[test]
    fn test_extract_reports_scores() {
        let pipeline = create_pipeline();
        let measurements = pipeline.extract("Weight: 5 kg approx");
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].value, "5");
        assert_eq!(measurements[0].unit, "kilogram");
        assert_eq!(measurements[0].score, 90);
    }

    #[test]
    fn test_normalize_for_entity_restricts_units() {
        let pipeline = create_pipeline();
        assert_eq!(
            pipeline.normalize_for_entity("500 g", "item_weight").unwrap(),
            vec!["500 gram"]
        );
        assert!(pipeline
            .normalize_for_entity("500 g", "voltage")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_normalize_for_unknown_entity() {
        let pipeline = create_pipeline();
        let err = pipeline.normalize_for_entity("500 g", "colour").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let pipeline = create_pipeline();
        let texts = vec!["5 kg", "", "12 v", "xyzzy 3 xyzzy"];
        let results = pipeline.normalize_batch(&texts);
        assert_eq!(
            results,
            vec![
                vec!["5 kilogram".to_string()],
                vec![],
                vec!["12 volt".to_string()],
                vec![],
            ]
        );
    }

    #[test]
    fn test_pipeline_shared_across_threads() {
        let pipeline = create_pipeline();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| pipeline.normalize("Weight: 5 kg approx")))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), vec!["5 kilogram"]);
            }
        });
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut vocabulary = MeasurementVocabulary::default();
        vocabulary.entity_units.retain(|entity, _| entity == "wattage");
        vocabulary.abbreviations.retain(|entry| entry.full == "kilowatt" || entry.full == "watt");
        assert!(vocabulary.validate().is_ok());

        let pipeline = MeasurementPipeline::new(vocabulary).unwrap();
        assert_eq!(pipeline.allowed_units().len(), 2);
        assert_eq!(pipeline.normalize("1500 w, 5 kg"), vec!["1500 watt"]);
    }
}
