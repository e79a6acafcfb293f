use crate::pipeline::face_prediction::{FaceAnalysis, FacePrediction};
use crate::shared::constants::{MALE, RACES};

/// Gender and race counts over the surviving predictions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breakdown {
    pub male: usize,
    /// Everything not predicted male, unknown included.
    pub female: usize,
    /// Known races first in fixed order, then any other value in order of
    /// first appearance.
    pub races: Vec<(String, usize)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub face_count: usize,
    /// Absent in boxes-only mode.
    pub breakdown: Option<Breakdown>,
}

impl Summary {
    pub fn of(analysis: &FaceAnalysis) -> Self {
        match analysis {
            FaceAnalysis::Predicted(predictions) => Self::from_predictions(predictions),
            FaceAnalysis::BoxesOnly(faces) => Summary {
                face_count: faces.len(),
                breakdown: None,
            },
        }
    }

    pub fn from_predictions(predictions: &[FacePrediction]) -> Self {
        let mut races: Vec<(String, usize)> =
            RACES.iter().map(|race| (race.to_string(), 0)).collect();
        let mut male = 0;

        for prediction in predictions {
            match races.iter_mut().find(|(race, _)| *race == prediction.race) {
                Some((_, count)) => *count += 1,
                None => races.push((prediction.race.clone(), 1)),
            }
            if prediction.gender == MALE {
                male += 1;
            }
        }

        let face_count = predictions.len();
        Summary {
            face_count,
            breakdown: Some(Breakdown {
                male,
                female: face_count - male,
                races,
            }),
        }
    }

    /// Header text drawn above the rendered image.
    ///
    /// The counts block always ends in a newline, so a breakdown without any
    /// race line still reserves one blank header line.
    pub fn header_text(&self) -> String {
        let mut text = format!("검출된 인원 수: {}명\n", self.face_count);
        if let Some(breakdown) = &self.breakdown {
            text.push_str(&format!("남성: {}명\n여성: {}명\n", breakdown.male, breakdown.female));
            let race_lines: Vec<String> = breakdown
                .races
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(race, count)| format!("{race}: {count}명"))
                .collect();
            text.push_str(&race_lines.join("\n"));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::face_box::FaceBox;

    fn prediction(race: &str, gender: &str) -> FacePrediction {
        FacePrediction {
            face: FaceBox::new(0, 0, 10, 10),
            race: race.into(),
            gender: gender.into(),
            box_color: [0, 0, 0],
            label: "20대".into(),
            is_target: false,
        }
    }

    #[test]
    fn test_counts_gender_and_race() {
        let summary = Summary::from_predictions(&[
            prediction("아시아", "남성"),
            prediction("아시아", "여성"),
            prediction("백인", "남성"),
        ]);
        let breakdown = summary.breakdown.unwrap();

        assert_eq!(summary.face_count, 3);
        assert_eq!((breakdown.male, breakdown.female), (2, 1));
        assert_eq!(
            breakdown.races,
            vec![
                ("백인".to_string(), 1),
                ("흑인".to_string(), 0),
                ("아시아".to_string(), 2),
                ("중동".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_unknown_gender_counts_as_female() {
        let summary = Summary::from_predictions(&[prediction("백인", "알 수 없음")]);
        let breakdown = summary.breakdown.unwrap();
        assert_eq!((breakdown.male, breakdown.female), (0, 1));
    }

    #[test]
    fn test_unknown_race_is_appended() {
        let summary = Summary::from_predictions(&[
            prediction("알 수 없음", "남성"),
            prediction("알 수 없음", "남성"),
        ]);
        let races = summary.breakdown.unwrap().races;
        assert_eq!(races.len(), 5);
        assert_eq!(races[4], ("알 수 없음".to_string(), 2));
    }

    #[test]
    fn test_header_text_lists_non_zero_races() {
        let summary = Summary::from_predictions(&[
            prediction("흑인", "남성"),
            prediction("중동", "여성"),
        ]);
        assert_eq!(
            summary.header_text(),
            "검출된 인원 수: 2명\n남성: 1명\n여성: 1명\n흑인: 1명\n중동: 1명"
        );
    }

    #[test]
    fn test_header_text_without_faces_keeps_trailing_line() {
        let summary = Summary::from_predictions(&[]);
        assert_eq!(
            summary.header_text(),
            "검출된 인원 수: 0명\n남성: 0명\n여성: 0명\n"
        );
        assert_eq!(summary.header_text().split('\n').count(), 4);
    }

    #[test]
    fn test_boxes_only_summary_has_count_only() {
        let analysis = FaceAnalysis::BoxesOnly(vec![FaceBox::new(0, 0, 5, 5); 3]);
        let summary = Summary::of(&analysis);

        assert_eq!(summary.face_count, 3);
        assert!(summary.breakdown.is_none());
        assert_eq!(summary.header_text(), "검출된 인원 수: 3명\n");
    }
}
