mod test_local_candidates_follow_description;
