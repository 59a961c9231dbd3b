mod entries;
